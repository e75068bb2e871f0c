//! Error types for the block mining subsystem
//!
//! Only faults live here. A wrong guess or a lost claim race is ordinary
//! steady-state behavior and is reported as a
//! [`SubmissionOutcome::Rejected`](crate::domain::SubmissionOutcome) instead.

use thiserror::Error;

/// Result type alias for block mining operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur while running the pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// Backing store failed or is unavailable
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Puzzle size outside what the generator accepts
    #[error("Invalid puzzle size: {size}")]
    InvalidPuzzleSize {
        /// Requested size
        size: u32,
    },

    /// Join request rejected during input validation
    #[error("Invalid participant: {reason}")]
    InvalidParticipant {
        /// Which field failed
        reason: String,
    },

    /// Store contents violate a lifecycle invariant
    #[error("Inconsistent state: {reason}")]
    InconsistentState {
        /// Reason for inconsistency
        reason: String,
    },
}

impl PoolError {
    /// Check if error is recoverable (caller may retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::InconsistentState { .. })
    }

    /// Check if error is critical (pool cannot serve requests)
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PoolError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
