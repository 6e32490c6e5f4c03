//! Persistent key-value substrate.
//!
//! RULE: Only the kv module talks to the backing storage.
//! Stores hand it whole JSON documents; they never see rows or files.

mod memory;
mod sqlite;

pub use memory::MemoryKv;
pub use sqlite::SqliteKv;

use crate::error::LumaResult;
use std::sync::Arc;

/// String-keyed blob storage. Values are JSON documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> LumaResult<Option<String>>;

    /// Insert or overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> LumaResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> LumaResult<()>;
}

pub type SharedKv = Arc<dyn KeyValueStore>;
