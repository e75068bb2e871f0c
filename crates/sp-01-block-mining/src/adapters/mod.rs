//! Adapters for the outbound ports

/// Wall clock and a settable test clock
pub mod clock;
/// Mutex-guarded in-memory store
pub mod memory;
/// SQLite-backed store
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use clock::{ManualClock, SystemClock};
pub use memory::InMemoryBlockStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBlockStore;
