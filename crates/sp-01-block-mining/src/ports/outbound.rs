//! Outbound ports (driven side - SPI)
//!
//! These are the interfaces the mining service requires the host application
//! to implement.

use crate::domain::{
    Block, BlockId, BlockSummary, LeaderboardEntry, MinedBlockInfo, MiningClaim, NewBlock,
    Participant, ParticipantId, ParticipantPage, ParticipantQuery, Registration,
};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Port: Persistent block and participant records
///
/// The store is the only shared mutable state of the pool. Every mutating
/// method is a single conditional write whose success is reported back to the
/// caller, so the lifecycle invariants hold even when several processes share
/// one store.
///
/// Production: `SqliteBlockStore` (adapters/sqlite.rs)
/// Testing: `InMemoryBlockStore` (adapters/memory.rs)
pub trait BlockStore: Send + Sync {
    /// The open block (`mined_at` unset), if any
    fn open_block(&self) -> Result<Option<Block>>;

    /// Block by id, open or mined
    fn block(&self, id: BlockId) -> Result<Option<Block>>;

    /// Up to `limit` mined blocks, newest first
    fn recent_mined(&self, limit: usize) -> Result<Vec<MinedBlockInfo>>;

    /// Hash of the most recently mined block
    fn last_mined_hash(&self) -> Result<Option<String>>;

    /// Insert a new open block unless one already exists
    ///
    /// Returns `None` when another open block exists; nothing is written then.
    fn insert_open_block(&self, draft: &NewBlock) -> Result<Option<Block>>;

    /// Rewrite an open block in place (same id), clearing any proof fields
    ///
    /// Returns `None` when the block is no longer open; nothing is written then.
    fn rewrite_open_block(&self, id: BlockId, draft: &NewBlock) -> Result<Option<Block>>;

    /// Atomically seal an open block
    ///
    /// ## Atomicity Guarantee
    ///
    /// Sets `mined_at`, `miner_id`, `nonce` and `hash` in one write, and only if
    /// `mined_at` is still unset at the moment of the write. Returns `true` if
    /// this call sealed the block, `false` if the block was already mined (or
    /// does not exist).
    fn claim_block(&self, claim: &MiningClaim) -> Result<bool>;

    /// Insert a participant, or update the group of an existing `(name, school)`
    fn upsert_participant(&self, registration: &Registration) -> Result<Participant>;

    /// Participant by id
    fn participant(&self, id: ParticipantId) -> Result<Option<Participant>>;

    /// Filtered page of participants ordered by join time, then id
    ///
    /// The query arrives normalized; `total` counts matches before paging.
    fn list_participants(&self, query: &ParticipantQuery) -> Result<ParticipantPage>;

    /// The newest `limit` blocks in ascending id order, task and solution redacted
    fn list_blocks(&self, limit: usize) -> Result<Vec<BlockSummary>>;

    /// Wins per participant, most wins first, earliest first win breaking ties
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>>;
}

/// Port: Wall clock (for testability)
pub trait Clock: Send + Sync {
    /// Current UTC time, second precision
    fn now(&self) -> DateTime<Utc>;
}
