//! # Integration Tests
//!
//! Full pool flows through the public service API, run against both store
//! adapters.

pub mod e2e;
pub mod persistence;
pub mod race;

use chrono::{TimeZone, Utc};
use sp_01_block_mining::{
    Block, BlockStore, ManualClock, MiningPoolService, PoolConfig, Position, SchulteTask,
};
use std::sync::Arc;

/// Clock fixed at a known instant
pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
    ))
}

/// Service with default configuration over `store`
pub fn service_over(store: Arc<dyn BlockStore>, clock: Arc<ManualClock>) -> MiningPoolService {
    match MiningPoolService::new(PoolConfig::default(), store, clock) {
        Ok(service) => service,
        Err(e) => panic!("default config rejected: {e}"),
    }
}

/// Correct answer for a block's puzzle
pub fn answer_for(block: &Block) -> Vec<Position> {
    let task = match SchulteTask::parse(&block.task_json) {
        Ok(task) => task,
        Err(defect) => panic!("block #{} is not a Schulte table: {defect}", block.id),
    };
    match sp_01_block_mining::domain::solve(&task) {
        Some(positions) => positions,
        None => panic!("block #{} grid is not a permutation", block.id),
    }
}
