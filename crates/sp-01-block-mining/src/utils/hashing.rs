//! Hashing utilities for proof issuance
//!
//! Provides the SHA-256 helpers and the hex zero-prefix checks shared by the
//! chain linker and every proof policy.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const HEX_HASH_LEN: usize = 64;

/// Compute SHA-256 hash of data
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute SHA-256 hash of data as lowercase hex
#[inline]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Low 32 bits of a digest read as a big-endian integer
///
/// Equivalent to `int(hexdigest, 16) & 0xFFFFFFFF`.
#[inline]
pub fn low_u32(digest: &[u8; 32]) -> u32 {
    u32::from_be_bytes([digest[28], digest[29], digest[30], digest[31]])
}

/// Canonical payload hashed by every proof policy
pub fn proof_payload(prev_hash: &str, task_json: &str, solver_tag: &str, nonce: Option<u64>) -> Vec<u8> {
    match nonce {
        Some(nonce) => format!("{prev_hash}|{task_json}|{solver_tag}|{nonce}").into_bytes(),
        None => format!("{prev_hash}|{task_json}|{solver_tag}").into_bytes(),
    }
}

/// Check if a hex hash starts with `difficulty` zero characters
#[inline]
pub fn meets_zero_prefix(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Overwrite the leading characters of a hex hash with zeros
///
/// The prefix is capped at the hash length, so the output length never changes.
pub fn force_zero_prefix(hash: &str, difficulty: u32) -> String {
    let prefix = (difficulty as usize).min(hash.len());
    let mut forged = "0".repeat(prefix);
    forged.push_str(&hash[prefix..]);
    forged
}
