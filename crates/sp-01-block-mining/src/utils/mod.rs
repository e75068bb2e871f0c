//! Utility modules for block mining

pub mod hashing;
pub mod validation;

pub use hashing::{force_zero_prefix, meets_zero_prefix, sha256, sha256_hex};
pub use validation::{
    normalize_participant_query, sanitize_field, validate_join, JoinFields, MAX_FIELD_LEN,
};
