//! Domain layer - Pure business logic for block mining
//!
//! This module contains the core domain entities, value objects, and services
//! that implement the puzzle-mining rules. All code here is pure (no I/O,
//! no async) following DDD principles.
//!
//! ## Entities
//!
//! - [`Block`]: One puzzle round, open until mined by exactly one solver
//! - [`Participant`]: A registered solver
//! - [`Puzzle`]: A generated Schulte table
//!
//! ## Services
//!
//! - [`puzzle::generate`]: Random Schulte table generation
//! - [`DifficultyController`]: Puzzle sizing from recent solve times (DDA)
//! - [`ChainLinker`]: Zero-prefix difficulty and `prev_hash` linkage
//! - [`ProofPolicy`]: `(nonce, hash)` issuance (forged, bounded or real search)
//! - [`submission::check_sequence`]: Structural solution check
//!
//! ## Invariants
//!
//! See [`invariants`] for the five lifecycle invariants every block obeys.

pub mod chain;
pub mod difficulty;
mod entities;
pub mod invariants;
pub mod proof;
pub mod puzzle;
pub mod submission;

pub use chain::{ChainConfig, ChainLinker, GENESIS_HASH};
pub use difficulty::{DifficultyConfig, DifficultyController, SizeDecision};
pub use entities::*;
pub use proof::{
    policy_for, BoundedSearchProof, ForgedProof, IssuedProof, ProofConfig, ProofInput, ProofMeta,
    ProofMode, ProofPolicy, RealSearchProof,
};
pub use puzzle::{Puzzle, SchulteTask, TaskDefect, EMPTY_SOLUTION_JSON, SCHULTE_TYPE};
pub use submission::{
    check_sequence, parse_positions, solve, MiningReceipt, Position, ProofOfWork, RejectReason,
    SequenceError, Submission, SubmissionOutcome, SubmitResponse, Winner,
};
