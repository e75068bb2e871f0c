//! # Runtime Configuration
//!
//! Pool settings plus the parameters of the simulated mining session.
//!
//! Sources, later wins:
//! 1. Built-in defaults
//! 2. JSON file named by `SP_CONFIG`
//! 3. `SP_DB_PATH`, `SP_TARGET_SECS`, `SP_PROOF_MODE`, `SP_MINERS`, `SP_ROUNDS`

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sp_01_block_mining::{PoolConfig, ProofMode};
use std::path::PathBuf;
use tracing::{info, warn};

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Mining pool configuration.
    pub pool: PoolConfig,
    /// Number of simulated solvers.
    pub miners: usize,
    /// Blocks to mine before stopping (0 = run until Ctrl+C).
    pub rounds: u64,
    /// Mean pause between a solver's attempts.
    pub think_time_ms: u64,
    /// Chance that a solver submits a wrong sequence.
    pub mistake_rate: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            miners: 4,
            rounds: 10,
            think_time_ms: 250,
            mistake_rate: 0.2,
        }
    }
}

impl RuntimeConfig {
    /// Validate the session parameters and the pool section.
    pub fn validate(&self) -> Result<()> {
        if self.miners == 0 {
            bail!("miners must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.mistake_rate) {
            bail!("mistake_rate {} outside [0, 1]", self.mistake_rate);
        }
        self.pool.validate().context("invalid pool configuration")?;
        Ok(())
    }

    /// Apply `SP_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SP_DB_PATH") {
            self.pool.storage.path = Some(PathBuf::from(path));
        }
        if let Some(secs) = lookup("SP_TARGET_SECS") {
            self.pool.difficulty.target_block_time = secs
                .parse()
                .with_context(|| format!("SP_TARGET_SECS is not a number: {secs}"))?;
        }
        if let Some(mode) = lookup("SP_PROOF_MODE") {
            self.pool.proof.mode = mode.parse::<ProofMode>().map_err(anyhow::Error::msg)?;
        }
        if let Some(miners) = lookup("SP_MINERS") {
            match miners.parse() {
                Ok(n) => self.miners = n,
                Err(_) => warn!("Ignoring SP_MINERS={}: not a count", miners),
            }
        }
        if let Some(rounds) = lookup("SP_ROUNDS") {
            match rounds.parse() {
                Ok(n) => self.rounds = n,
                Err(_) => warn!("Ignoring SP_ROUNDS={}: not a count", rounds),
            }
        }
        Ok(())
    }
}

/// Load configuration from the environment and an optional JSON file.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = match std::env::var("SP_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            info!("Loaded configuration from {}", path);
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {path}"))?
        }
        Err(_) => RuntimeConfig::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.miners, 4);
        assert!(config.pool.storage.path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(env(&[
                ("SP_DB_PATH", "/var/lib/pool.db"),
                ("SP_TARGET_SECS", "45"),
                ("SP_PROOF_MODE", "bounded"),
                ("SP_MINERS", "8"),
                ("SP_ROUNDS", "0"),
            ]))
            .unwrap();

        assert_eq!(
            config.pool.storage.path,
            Some(PathBuf::from("/var/lib/pool.db"))
        );
        assert_eq!(config.pool.difficulty.target_block_time, 45.0);
        assert_eq!(config.pool.proof.mode, ProofMode::BoundedSearch);
        assert_eq!(config.miners, 8);
        assert_eq!(config.rounds, 0);
    }

    #[test]
    fn test_bad_overrides() {
        let mut config = RuntimeConfig::default();
        assert!(config
            .apply_overrides(env(&[("SP_PROOF_MODE", "lottery")]))
            .is_err());
        assert!(config
            .apply_overrides(env(&[("SP_TARGET_SECS", "soon")]))
            .is_err());

        config
            .apply_overrides(env(&[("SP_MINERS", "many")]))
            .unwrap();
        assert_eq!(config.miners, 4);
    }

    #[test]
    fn test_json_sections() {
        let config: RuntimeConfig = serde_json::from_str(
            r#"{"miners": 2, "pool": {"difficulty": {"base_size": 6}}}"#,
        )
        .unwrap();
        assert_eq!(config.miners, 2);
        assert_eq!(config.pool.difficulty.base_size, 6);
        assert_eq!(config.rounds, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = RuntimeConfig {
            miners: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());

        config.miners = 1;
        config.mistake_rate = 1.5;
        assert!(config.validate().is_err());

        config.mistake_rate = 0.0;
        config.pool.difficulty.window = 0;
        assert!(config.validate().is_err());
    }
}
