//! Durable key/value storage for tagtrack
//!
//! The dispatch queue snapshot, the lifecycle log, and the install UUID each
//! live under one key. No multi-key transactions are needed: every writer runs
//! on the tracker's own loop and each key has a single owner.
//!
//! - [`SqliteStore`]: SQLite file with embedded migrations
//! - [`MemoryStore`]: process-local map for tests and dry runs

mod memory;
pub mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;

/// Key holding the newline-joined dispatch queue written on sleep
pub const QUEUE_SNAPSHOT_KEY: &str = "dispatch_queue";

/// Key holding the JSON-encoded lifecycle record
pub const LIFECYCLE_LOG_KEY: &str = "lifecycle_log";

/// Key holding the per-install UUID
pub const INSTALL_UUID_KEY: &str = "install_uuid";

/// Minimal durable key/value contract.
pub trait KvStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write (or overwrite) a value
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Read a value as UTF-8 text
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    /// Write UTF-8 text
    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value.as_bytes())
    }
}
