//! # Schulte Pool - Block Mining Core (Subsystem 01)
//!
//! **Bounded Context:** Puzzle Mining & Block Lifecycle
//! **Architecture Compliance:** DDD + Hexagonal + TDD
//!
//! ## Purpose
//!
//! Participants race to solve Schulte tables (`N×N` grids holding `1..=N²`,
//! solved by pointing at the cells in increasing order). The first correct
//! solver atomically claims the open block and receives a proof-of-work style
//! `(nonce, hash)`; the block then joins a hash chain and the next puzzle is
//! sized from recent solve times.
//!
//! ## Key Design Principles
//!
//! 1. **Single Atomic Claim**: one conditional write `OPEN → MINED`, never read-then-write
//! 2. **Store as Sole Shared State**: all coordination goes through [`ports::BlockStore`]
//! 3. **Rejections Are Outcomes**: wrong guesses and lost races are not errors
//! 4. **Swappable Proof Policy**: forged, bounded search or real search
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Adapters (Outer)                                   │
//! │  - InMemoryBlockStore / SqliteBlockStore            │
//! │  - SystemClock / ManualClock                        │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports (Middle)                                     │
//! │  - Inbound: MiningPoolApi                           │
//! │  - Outbound: BlockStore, Clock                      │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (Inner - Pure Logic)                        │
//! │  - Puzzle generator, DifficultyController           │
//! │  - ChainLinker, ProofPolicy                         │
//! │  - Submission check, lifecycle invariants           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Critical Invariants
//!
//! 1. **Square Puzzles**: `width == height`
//! 2. **Atomic Seal**: `mined_at`, `miner_id`, `nonce`, `hash` set together, exactly once
//! 3. **Proof Prefix**: a mined block's hash starts with `difficulty` zeros
//! 4. **Single Open Block**: at most one block is open at any time
//! 5. **Chain Link**: `prev_hash` is the hash of the last block mined before it opened
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sp_01_block_mining::{
//!     InMemoryBlockStore, MiningPoolApi, MiningPoolService, PoolConfig, Submission, SystemClock,
//! };
//!
//! let service = MiningPoolService::new(
//!     PoolConfig::default(),
//!     Arc::new(InMemoryBlockStore::new()),
//!     Arc::new(SystemClock),
//! )?;
//! let alice = service.join("alice", "north", None)?;
//! let view = service.current_block()?;
//! let outcome = service.submit(&Submission::for_open_block(alice.id, positions))?;
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: Pure domain logic (puzzles, DDA, chain linkage, proofs, validation)
//! - [`ports`]: Hexagonal architecture interfaces (inbound/outbound)
//! - [`adapters`]: Store and clock implementations
//! - [`service`]: Block lifecycle and claim orchestration

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Store and clock adapters
pub mod adapters;
/// Domain models and business logic
pub mod domain;
pub mod ports;
pub mod service;
pub mod utils;

mod config;
mod error;
mod metrics;

pub use config::{PoolConfig, StorageConfig};
pub use error::{PoolError, Result};
pub use metrics::{MetricsSnapshot, PoolMetrics};

// Re-export commonly used types
pub use domain::{
    Block, BlockId, BlockSummary, ChainConfig, CurrentBlockView, DifficultyConfig,
    LeaderboardEntry, MiningReceipt, Participant, ParticipantId, ParticipantPage,
    ParticipantQuery, Position, ProofConfig, ProofMode, RejectReason, SchulteTask, SortOrder,
    Submission, SubmissionOutcome, SubmitResponse, GENESIS_HASH,
};

pub use ports::{BlockStore, Clock, MiningPoolApi};

pub use adapters::{InMemoryBlockStore, ManualClock, SystemClock};
#[cfg(feature = "sqlite")]
pub use adapters::SqliteBlockStore;

pub use service::MiningPoolService;

/// Default number of blocks returned by a chain listing
pub const DEFAULT_BLOCK_LISTING: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BLOCK_LISTING, 20);
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }
}
