//! Invariant checkers for the block lifecycle
//!
//! 1. Square puzzles: `width == height`
//! 2. Atomic seal: `mined_at`, `miner_id`, `nonce` and `hash` are all set or all absent
//! 3. Proof prefix: a mined block's hash carries `difficulty` leading zeros
//! 4. Single open block: at most one block has `mined_at` unset
//! 5. Chain link: each block's `prev_hash` is the hash of the last block mined before it

use super::chain::GENESIS_HASH;
use super::entities::Block;
use crate::error::{PoolError, Result};
use crate::utils::hashing::meets_zero_prefix;

fn violation(reason: String) -> PoolError {
    PoolError::InconsistentState { reason }
}

/// INVARIANT-1: Square puzzles
pub fn check_square(block: &Block) -> Result<()> {
    if block.width != block.height {
        return Err(violation(format!(
            "block #{} is {}x{}",
            block.id, block.width, block.height
        )));
    }
    Ok(())
}

/// INVARIANT-2: Atomic seal
pub fn check_seal(block: &Block) -> Result<()> {
    let set = [
        block.mined_at.is_some(),
        block.miner_id.is_some(),
        block.nonce.is_some(),
        block.hash.is_some(),
    ];
    if set.iter().any(|s| *s != set[0]) {
        return Err(violation(format!(
            "block #{} is partially sealed",
            block.id
        )));
    }
    Ok(())
}

/// INVARIANT-3: Proof prefix
pub fn check_proof_prefix(block: &Block) -> Result<()> {
    if let Some(hash) = &block.hash {
        if !meets_zero_prefix(hash, block.difficulty) {
            return Err(violation(format!(
                "block #{} hash lacks {} leading zeros",
                block.id, block.difficulty
            )));
        }
    }
    Ok(())
}

/// INVARIANT-4: Single open block
pub fn check_single_open(blocks: &[Block]) -> Result<()> {
    let open: Vec<u64> = blocks.iter().filter(|b| b.is_open()).map(|b| b.id).collect();
    if open.len() > 1 {
        return Err(violation(format!("multiple open blocks: {:?}", open)));
    }
    Ok(())
}

/// INVARIANT-5: Chain link
///
/// `blocks` must be in id order. Blocks are mined in the order they were
/// opened, so each block links to the hash of the closest mined predecessor.
pub fn check_chain_links(blocks: &[Block]) -> Result<()> {
    let mut expected: &str = GENESIS_HASH;
    for block in blocks {
        if block.prev_hash != expected {
            return Err(violation(format!(
                "block #{} links to {} instead of {}",
                block.id, block.prev_hash, expected
            )));
        }
        if let Some(hash) = &block.hash {
            expected = hash.as_str();
        }
    }
    Ok(())
}

/// Per-block checks applied to every block the lifecycle hands out
pub fn check_block(block: &Block) -> Result<()> {
    check_square(block)?;
    check_seal(block)?;
    check_proof_prefix(block)
}
