//! Configuration types for the mining pool

use crate::domain::{ChainConfig, DifficultyConfig, ProofConfig};
use crate::error::{PoolError, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Runtime configuration for the mining pool
///
/// Every section has defaults, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Puzzle sizing (DDA)
    pub difficulty: DifficultyConfig,

    /// Zero-prefix table and chain linkage
    pub chain: ChainConfig,

    /// Proof issuance
    pub proof: ProofConfig,

    /// Backing store
    pub storage: StorageConfig,
}

/// Storage configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file (default: in-memory store)
    pub path: Option<PathBuf>,
}

impl PoolConfig {
    /// Parse a JSON config document and validate it
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.difficulty
            .validate()
            .map_err(|e| PoolError::InvalidConfig(format!("difficulty: {e}")))?;
        self.chain
            .validate()
            .map_err(|e| PoolError::InvalidConfig(format!("chain: {e}")))?;
        self.proof
            .validate()
            .map_err(|e| PoolError::InvalidConfig(format!("proof: {e}")))?;
        Ok(())
    }
}
