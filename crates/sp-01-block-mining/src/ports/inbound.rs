//! Inbound ports (driving side - API)

use crate::domain::{
    Block, BlockSummary, CurrentBlockView, LeaderboardEntry, Participant, ParticipantPage,
    ParticipantQuery, Submission, SubmissionOutcome,
};
use crate::error::Result;

/// Primary port: Mining pool service
///
/// This is the contract the excluded outer layer (HTTP handlers, CLI) talks to.
pub trait MiningPoolApi: Send + Sync {
    /// Register a participant, or update the group of an existing one
    fn join(&self, name: &str, school: &str, group: Option<&str>) -> Result<Participant>;

    /// Make sure a playable open block exists and return it
    ///
    /// With `force_new` the reuse check is skipped and a fresh block is opened
    /// (used right after a win).
    fn ensure_open_block(&self, force_new: bool) -> Result<Block>;

    /// Client view of the open block (never includes the solution)
    fn current_block(&self) -> Result<CurrentBlockView>;

    /// Validate a candidate solution and try to claim the block
    fn submit(&self, submission: &Submission) -> Result<SubmissionOutcome>;

    /// The newest `limit` blocks, task and solution redacted
    fn blocks(&self, limit: usize) -> Result<Vec<BlockSummary>>;

    /// Search and page through registered participants
    ///
    /// Text filters are sanitized like join fields and the page size is
    /// clamped to `1..=500`.
    fn list_participants(&self, query: &ParticipantQuery) -> Result<ParticipantPage>;

    /// Wins per participant
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>>;
}
