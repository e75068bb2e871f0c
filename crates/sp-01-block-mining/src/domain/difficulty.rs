//! Dynamic Difficulty Adjustment (DDA)
//!
//! Resizes the next puzzle so that solve times converge toward a target.
//! The controller looks at the last `window` mined blocks (newest first),
//! smooths their solve durations with an exponential moving average and moves
//! the grid size by at most one step per block.
//!
//! A hysteresis band around the target (`fast_factor`..`slow_factor`) keeps
//! the size from oscillating when solvers are roughly on pace.

use super::entities::MinedBlockInfo;
use serde::Deserialize;

/// Difficulty adjustment configuration
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Size used before anything has been mined
    pub base_size: u32,

    /// Smallest grid the controller will shrink to
    pub min_size: u32,

    /// Largest grid the controller will grow to
    pub max_size: u32,

    /// Target solve time per block (in seconds)
    pub target_block_time: f64,

    /// Number of recent mined blocks to look at
    pub window: usize,

    /// EMA below `fast_factor × target` grows the grid
    pub fast_factor: f64,

    /// EMA above `slow_factor × target` shrinks the grid
    pub slow_factor: f64,

    /// EMA smoothing factor (weight of the newer sample)
    pub smoothing: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            base_size: 5,
            min_size: 5,
            max_size: 15,
            target_block_time: 120.0, // 2 minutes per block
            window: 5,
            fast_factor: 0.9,
            slow_factor: 1.1,
            smoothing: 0.5,
        }
    }
}

impl DifficultyConfig {
    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.min_size == 0 {
            return Err("min_size must be at least 1".into());
        }
        if self.min_size > self.max_size {
            return Err(format!(
                "min_size {} exceeds max_size {}",
                self.min_size, self.max_size
            ));
        }
        if !(self.min_size..=self.max_size).contains(&self.base_size) {
            return Err(format!(
                "base_size {} outside [{}, {}]",
                self.base_size, self.min_size, self.max_size
            ));
        }
        if self.window == 0 {
            return Err("window must be at least 1".into());
        }
        if !(self.target_block_time > 0.0) {
            return Err("target_block_time must be positive".into());
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(format!("smoothing {} outside (0, 1]", self.smoothing));
        }
        if !(self.fast_factor > 0.0 && self.fast_factor <= self.slow_factor) {
            return Err(format!(
                "fast_factor {} must be positive and not above slow_factor {}",
                self.fast_factor, self.slow_factor
            ));
        }
        Ok(())
    }
}

/// Direction of the last sizing decision, for logging
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SizeDecision {
    /// Nothing mined yet, base size used
    Base,
    /// Solves were fast, grid grows
    Grow,
    /// Solves were slow, grid shrinks
    Shrink,
    /// Inside the band (or at a bound)
    Hold,
}

/// Puzzle size controller
#[derive(Clone, Debug)]
pub struct DifficultyController {
    config: DifficultyConfig,
}

impl DifficultyController {
    /// Create a new difficulty controller
    pub fn new(config: DifficultyConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }

    /// Size of the next puzzle
    ///
    /// # Arguments
    /// * `history` - Recent mined blocks in descending order (newest first)
    pub fn next_size(&self, history: &[MinedBlockInfo]) -> u32 {
        self.decide(history).0
    }

    /// Size of the next puzzle together with the reason
    pub fn decide(&self, history: &[MinedBlockInfo]) -> (u32, SizeDecision) {
        let min = self.config.min_size;
        let max = self.config.max_size;

        let Some(newest) = history.first() else {
            return (self.config.base_size.clamp(min, max), SizeDecision::Base);
        };
        let last_size = newest.width;

        let Some(ema) = self.smoothed_solve_time(history) else {
            return (last_size.clamp(min, max), SizeDecision::Hold);
        };

        let target = self.config.target_block_time;
        let (size, decision) = if ema < target * self.config.fast_factor && last_size < max {
            (last_size + 1, SizeDecision::Grow)
        } else if ema > target * self.config.slow_factor && last_size > min {
            (last_size - 1, SizeDecision::Shrink)
        } else {
            (last_size, SizeDecision::Hold)
        };
        (size.clamp(min, max), decision)
    }

    /// EMA of positive solve durations inside the window
    ///
    /// The window is newest-first; the fold runs oldest to newest so the
    /// oldest retained sample seeds the average.
    pub fn smoothed_solve_time(&self, history: &[MinedBlockInfo]) -> Option<f64> {
        let alpha = self.config.smoothing;
        history
            .iter()
            .take(self.config.window)
            .map(MinedBlockInfo::solve_secs)
            .filter(|secs| *secs > 0.0)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .fold(None, |ema, secs| match ema {
                None => Some(secs),
                Some(prev) => Some(alpha * secs + (1.0 - alpha) * prev),
            })
    }
}
