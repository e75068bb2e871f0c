//! Metrics collection for the mining pool

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the mining pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Blocks inserted as new open blocks
    pub blocks_opened: AtomicU64,

    /// Malformed open blocks repaired in place
    pub blocks_rewritten: AtomicU64,

    /// Submissions that mined a block
    pub submissions_accepted: AtomicU64,

    /// Submissions rejected for any reason
    pub submissions_rejected: AtomicU64,

    /// Correct solutions that lost the claim race
    pub claims_lost: AtomicU64,

    /// Total proof issuance time (microseconds)
    pub proof_time_us: AtomicU64,
}

/// Point-in-time copy of [`PoolMetrics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Blocks inserted as new open blocks
    pub blocks_opened: u64,
    /// Malformed open blocks repaired in place
    pub blocks_rewritten: u64,
    /// Submissions that mined a block
    pub submissions_accepted: u64,
    /// Submissions rejected for any reason
    pub submissions_rejected: u64,
    /// Correct solutions that lost the claim race
    pub claims_lost: u64,
    /// Total proof issuance time (microseconds)
    pub proof_time_us: u64,
}

impl PoolMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened block
    pub fn record_block_opened(&self) {
        self.blocks_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an in-place repair of the open block
    pub fn record_block_rewritten(&self) {
        self.blocks_rewritten.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a winning submission
    pub fn record_accepted(&self) {
        self.submissions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected submission
    pub fn record_rejected(&self) {
        self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a correct solution that arrived after the block was claimed
    pub fn record_claim_lost(&self) {
        self.claims_lost.fetch_add(1, Ordering::Relaxed);
    }

    /// Record proof issuance time
    pub fn record_proof_time(&self, duration_us: u64) {
        self.proof_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Average proof issuance time per issued proof (microseconds)
    ///
    /// A proof is issued for every claim attempt, won or lost.
    pub fn avg_proof_time_us(&self) -> f64 {
        let issued = self.submissions_accepted.load(Ordering::Relaxed)
            + self.claims_lost.load(Ordering::Relaxed);
        if issued == 0 {
            return 0.0;
        }
        self.proof_time_us.load(Ordering::Relaxed) as f64 / issued as f64
    }

    /// Copy all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blocks_opened: self.blocks_opened.load(Ordering::Relaxed),
            blocks_rewritten: self.blocks_rewritten.load(Ordering::Relaxed),
            submissions_accepted: self.submissions_accepted.load(Ordering::Relaxed),
            submissions_rejected: self.submissions_rejected.load(Ordering::Relaxed),
            claims_lost: self.claims_lost.load(Ordering::Relaxed),
            proof_time_us: self.proof_time_us.load(Ordering::Relaxed),
        }
    }
}
