//! Proof issuance
//!
//! The winner of a block gets a `(nonce, hash)` pair whose hash starts with
//! the block's required number of hex zeros. Three policies share that output
//! shape and are selected by [`ProofMode`]:
//!
//! | Mode | Behavior | Cost |
//! |------|----------|------|
//! | `forged` | deterministic nonce, zero prefix written over the hash | O(1) |
//! | `bounded-search` | brute force for a limited budget, then forge | bounded |
//! | `real-search` | brute force until the natural hash qualifies | unbounded |
//!
//! All hashes are SHA-256 over `"{prev_hash}|{task_json}|{solver_tag}|{nonce}"`.

use crate::utils::hashing::{
    force_zero_prefix, low_u32, meets_zero_prefix, proof_payload, sha256, sha256_hex,
};
use serde::Deserialize;

/// Proof issuance policy selector
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofMode {
    /// Zero prefix written over the content hash
    Forged,
    /// Limited brute-force search, forge on exhaustion
    BoundedSearch,
    /// Unlimited brute-force search
    RealSearch,
}

impl ProofMode {
    /// Config/log name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofMode::Forged => "forged",
            ProofMode::BoundedSearch => "bounded-search",
            ProofMode::RealSearch => "real-search",
        }
    }
}

impl std::str::FromStr for ProofMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forged" | "fake" => Ok(ProofMode::Forged),
            "bounded-search" | "bounded" => Ok(ProofMode::BoundedSearch),
            "real-search" | "real" => Ok(ProofMode::RealSearch),
            other => Err(format!("unknown proof mode: {other}")),
        }
    }
}

/// Proof issuance configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    /// Policy used for every mined block
    pub mode: ProofMode,

    /// Forged nonces are reduced modulo this value
    pub nonce_modulus: u64,

    /// Bounded search budget per difficulty level above one
    pub bounded_iterations: u64,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            mode: ProofMode::Forged,
            nonce_modulus: 100_000,
            bounded_iterations: 50_000,
        }
    }
}

impl ProofConfig {
    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.nonce_modulus == 0 {
            return Err("nonce_modulus must be at least 1".into());
        }
        Ok(())
    }
}

/// Inputs every policy hashes over
#[derive(Clone, Copy, Debug)]
pub struct ProofInput<'a> {
    /// Link stored on the block
    pub prev_hash: &'a str,
    /// Canonical task payload
    pub task_json: &'a str,
    /// Solver identity (`name|school`)
    pub solver_tag: &'a str,
    /// Required zero-prefix length
    pub difficulty: u32,
}

/// How a proof was obtained
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofMeta {
    /// Policy that produced the proof
    pub mode: ProofMode,
    /// Hashes computed during the search (search modes only)
    pub iterations: Option<u64>,
    /// Whether the search found a natural hash (bounded mode only)
    pub found: Option<bool>,
}

/// Issued `(nonce, hash)` pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedProof {
    /// Nonce
    pub nonce: u64,
    /// Hash with the required zero prefix
    pub hash: String,
    /// Diagnostics
    pub meta: ProofMeta,
}

/// A proof issuance policy
pub trait ProofPolicy: Send + Sync {
    /// Which mode this policy implements
    fn mode(&self) -> ProofMode;

    /// Produce a proof whose hash carries `input.difficulty` leading zeros
    fn issue(&self, input: &ProofInput<'_>) -> IssuedProof;
}

/// Hash of the proof payload for a given nonce
fn content_hash(input: &ProofInput<'_>, nonce: u64) -> String {
    sha256_hex(&proof_payload(
        input.prev_hash,
        input.task_json,
        input.solver_tag,
        Some(nonce),
    ))
}

/// Deterministic, computation-free proof
#[derive(Clone, Debug)]
pub struct ForgedProof {
    nonce_modulus: u64,
}

impl ForgedProof {
    /// Create a forging policy
    pub fn new(nonce_modulus: u64) -> Self {
        Self {
            nonce_modulus: nonce_modulus.max(1),
        }
    }

    /// Small nonce derived from the block and solver
    pub fn derive_nonce(&self, input: &ProofInput<'_>) -> u64 {
        let seed = sha256(&proof_payload(
            input.prev_hash,
            input.task_json,
            input.solver_tag,
            None,
        ));
        u64::from(low_u32(&seed)) % self.nonce_modulus
    }
}

impl ProofPolicy for ForgedProof {
    fn mode(&self) -> ProofMode {
        ProofMode::Forged
    }

    fn issue(&self, input: &ProofInput<'_>) -> IssuedProof {
        let nonce = self.derive_nonce(input);
        let hash = force_zero_prefix(&content_hash(input, nonce), input.difficulty);
        IssuedProof {
            nonce,
            hash,
            meta: ProofMeta {
                mode: ProofMode::Forged,
                iterations: None,
                found: None,
            },
        }
    }
}

/// Brute force with a budget, forging when the budget runs out
#[derive(Clone, Debug)]
pub struct BoundedSearchProof {
    iterations_per_level: u64,
}

impl BoundedSearchProof {
    /// Create a bounded search policy
    pub fn new(iterations_per_level: u64) -> Self {
        Self {
            iterations_per_level,
        }
    }

    /// Total search budget for a difficulty
    pub fn budget(&self, difficulty: u32) -> u64 {
        self.iterations_per_level
            .saturating_mul(u64::from(difficulty.saturating_sub(1).max(1)))
    }
}

impl ProofPolicy for BoundedSearchProof {
    fn mode(&self) -> ProofMode {
        ProofMode::BoundedSearch
    }

    fn issue(&self, input: &ProofInput<'_>) -> IssuedProof {
        let budget = self.budget(input.difficulty);
        for nonce in 0..budget {
            let hash = content_hash(input, nonce);
            if meets_zero_prefix(&hash, input.difficulty) {
                return IssuedProof {
                    nonce,
                    hash,
                    meta: ProofMeta {
                        mode: ProofMode::BoundedSearch,
                        iterations: Some(nonce + 1),
                        found: Some(true),
                    },
                };
            }
        }

        let hash = force_zero_prefix(&content_hash(input, budget), input.difficulty);
        IssuedProof {
            nonce: budget,
            hash,
            meta: ProofMeta {
                mode: ProofMode::BoundedSearch,
                iterations: Some(budget),
                found: Some(false),
            },
        }
    }
}

/// Unbounded brute-force search
///
/// Expected work is `16^difficulty` hashes; only practical for small
/// difficulties.
#[derive(Clone, Debug, Default)]
pub struct RealSearchProof;

impl ProofPolicy for RealSearchProof {
    fn mode(&self) -> ProofMode {
        ProofMode::RealSearch
    }

    fn issue(&self, input: &ProofInput<'_>) -> IssuedProof {
        let mut nonce = 0u64;
        loop {
            let hash = content_hash(input, nonce);
            if meets_zero_prefix(&hash, input.difficulty) {
                return IssuedProof {
                    nonce,
                    hash,
                    meta: ProofMeta {
                        mode: ProofMode::RealSearch,
                        iterations: Some(nonce + 1),
                        found: Some(true),
                    },
                };
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

/// Build the policy selected by the configuration
pub fn policy_for(config: &ProofConfig) -> Box<dyn ProofPolicy> {
    match config.mode {
        ProofMode::Forged => Box::new(ForgedProof::new(config.nonce_modulus)),
        ProofMode::BoundedSearch => Box::new(BoundedSearchProof::new(config.bounded_iterations)),
        ProofMode::RealSearch => Box::new(RealSearchProof),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::GENESIS_HASH;
    use crate::utils::hashing::HEX_HASH_LEN;

    const TASK: &str = r#"{"grid": [[3, 1], [4, 2]], "size": 2, "type": "schulte"}"#;

    fn input(difficulty: u32) -> ProofInput<'static> {
        ProofInput {
            prev_hash: GENESIS_HASH,
            task_json: TASK,
            solver_tag: "Ana|Escola",
            difficulty,
        }
    }

    #[test]
    fn test_forged_prefix_for_every_difficulty() {
        let policy = ForgedProof::new(100_000);
        for difficulty in 0..=12 {
            let proof = policy.issue(&input(difficulty));
            assert!(
                meets_zero_prefix(&proof.hash, difficulty),
                "difficulty {} produced {}",
                difficulty,
                proof.hash
            );
            assert_eq!(proof.hash.len(), HEX_HASH_LEN);
        }
    }

    #[test]
    fn test_forged_is_deterministic_and_bounded() {
        let policy = ForgedProof::new(100_000);
        let a = policy.issue(&input(4));
        let b = policy.issue(&input(4));
        assert_eq!(a, b);
        assert!(a.nonce < 100_000);
    }

    #[test]
    fn test_forged_suffix_matches_content_hash() {
        let policy = ForgedProof::new(100_000);
        let proof = policy.issue(&input(6));
        let natural = content_hash(&input(6), proof.nonce);
        assert_eq!(&proof.hash[6..], &natural[6..]);
    }

    #[test]
    fn test_forged_nonce_depends_on_solver() {
        let policy = ForgedProof::new(u64::MAX);
        let mut other = input(4);
        other.solver_tag = "Bruno|Escola";
        assert_ne!(policy.derive_nonce(&input(4)), policy.derive_nonce(&other));
    }

    #[test]
    fn test_bounded_budget() {
        let policy = BoundedSearchProof::new(10);
        assert_eq!(policy.budget(0), 10);
        assert_eq!(policy.budget(1), 10);
        assert_eq!(policy.budget(4), 30);
    }

    #[test]
    fn test_bounded_search_finds_easy_prefix() {
        let policy = BoundedSearchProof::new(10_000);
        let proof = policy.issue(&input(1));
        assert_eq!(proof.meta.found, Some(true));
        assert!(meets_zero_prefix(&proof.hash, 1));
        assert_eq!(proof.hash, content_hash(&input(1), proof.nonce));
    }

    #[test]
    fn test_bounded_search_forges_when_exhausted() {
        let policy = BoundedSearchProof::new(1);
        let proof = policy.issue(&input(12));
        assert_eq!(proof.meta.found, Some(false));
        assert_eq!(proof.nonce, 11);
        assert!(meets_zero_prefix(&proof.hash, 12));
    }

    #[test]
    fn test_real_search_natural_hash() {
        let proof = RealSearchProof.issue(&input(2));
        assert!(meets_zero_prefix(&proof.hash, 2));
        assert_eq!(proof.hash, content_hash(&input(2), proof.nonce));
    }

    #[test]
    fn test_policy_for_mode() {
        let mut config = ProofConfig::default();
        assert_eq!(policy_for(&config).mode(), ProofMode::Forged);
        config.mode = ProofMode::BoundedSearch;
        assert_eq!(policy_for(&config).mode(), ProofMode::BoundedSearch);
        config.mode = ProofMode::RealSearch;
        assert_eq!(policy_for(&config).mode(), ProofMode::RealSearch);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("bounded".parse::<ProofMode>(), Ok(ProofMode::BoundedSearch));
        assert_eq!("real-search".parse::<ProofMode>(), Ok(ProofMode::RealSearch));
        assert!("lottery".parse::<ProofMode>().is_err());
    }
}
