//! In-memory substrate.
//!
//! Mirrors browser local storage, including its quota: when a byte limit
//! is configured, a write that would push the total past it fails with
//! `QuotaExceeded` and leaves the previous value in place.

use super::KeyValueStore;
use crate::error::{LumaError, LumaResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Limit total stored bytes (keys + values).
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently stored. Returns 0 if the lock is poisoned.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .lock()
            .map(|e| e.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    fn lock(&self, context: &str) -> LumaResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| LumaError::Storage(format!("MemoryKv: lock poisoned during {context}")))
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> LumaResult<Option<String>> {
        Ok(self.lock("get")?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> LumaResult<()> {
        let mut entries = self.lock("set")?;
        if let Some(limit) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(LumaError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> LumaResult<()> {
        self.lock("remove")?.remove(key);
        Ok(())
    }
}
