//! # Schulte Pool Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (generation, proofs, claims)
//! └── src/
//!     └── integration/  # Cross-module flows against real stores
//!         ├── e2e.rs          # Empty store → genesis block → mined → linked
//!         ├── race.rs         # Concurrent claims on one block
//!         └── persistence.rs  # SQLite reopen, shared database file
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sp-tests
//!
//! # By category
//! cargo test -p sp-tests integration::race
//!
//! # Benchmarks
//! cargo bench -p sp-tests
//! ```

#![allow(dead_code)]

pub mod integration;
