//! Chain linkage
//!
//! Every block carries the hash of the most recently mined block at the time
//! it was opened, which turns the block table into a hash chain. There is a
//! single writer sequence (blocks are mined one at a time), so no fork choice
//! is needed. The very first block links to [`GENESIS_HASH`].
//!
//! The linker also maps a puzzle size to the number of leading hex zeros the
//! block's proof hash must carry.

use crate::utils::hashing::HEX_HASH_LEN;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Link used by blocks opened before anything was mined
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Chain linkage configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Required zero-prefix length per puzzle size
    pub difficulty_table: BTreeMap<u32, u32>,

    /// Zero-prefix length for sizes missing from the table
    pub default_difficulty: u32,

    /// Hard ceiling on any zero-prefix length
    pub max_difficulty: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        // 5x5 needs 5 zeros up to 12x12 with 12; larger grids stay at 12
        let difficulty_table = (5..=15).map(|size| (size, size.min(12))).collect();
        Self {
            difficulty_table,
            default_difficulty: 3,
            max_difficulty: 12,
        }
    }
}

impl ChainConfig {
    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.max_difficulty as usize > HEX_HASH_LEN {
            return Err(format!(
                "max_difficulty {} exceeds hash length {}",
                self.max_difficulty, HEX_HASH_LEN
            ));
        }
        if self.default_difficulty > self.max_difficulty {
            return Err(format!(
                "default_difficulty {} exceeds max_difficulty {}",
                self.default_difficulty, self.max_difficulty
            ));
        }
        let mut previous: Option<(u32, u32)> = None;
        for (&size, &difficulty) in &self.difficulty_table {
            if difficulty > self.max_difficulty {
                return Err(format!(
                    "difficulty {} for size {} exceeds max_difficulty {}",
                    difficulty, size, self.max_difficulty
                ));
            }
            if let Some((prev_size, prev_difficulty)) = previous {
                if difficulty < prev_difficulty {
                    return Err(format!(
                        "difficulty table decreases between size {} and {}",
                        prev_size, size
                    ));
                }
            }
            previous = Some((size, difficulty));
        }
        Ok(())
    }
}

/// Assigns difficulty and previous-hash links to new blocks
#[derive(Clone, Debug)]
pub struct ChainLinker {
    config: ChainConfig,
}

impl ChainLinker {
    /// Create a new chain linker
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    /// Required leading hex zeros for a puzzle of the given size
    pub fn difficulty_for(&self, size: u32) -> u32 {
        self.config
            .difficulty_table
            .get(&size)
            .copied()
            .unwrap_or(self.config.default_difficulty)
            .min(self.config.max_difficulty)
    }

    /// Highest zero-prefix length this linker can assign
    pub fn max_difficulty(&self) -> u32 {
        self.config.max_difficulty
    }

    /// `prev_hash` for the next block given the last mined hash, if any
    pub fn link(&self, last_mined_hash: Option<String>) -> String {
        last_mined_hash
            .filter(|hash| !hash.is_empty())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }
}
