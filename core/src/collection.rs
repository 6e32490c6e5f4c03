//! The contract every domain store is built on.
//!
//! A Collection is one in-memory array of records mirrored to one key in
//! the KV substrate. RULES:
//!   - Every mutation rewrites the whole array under the key.
//!   - Load and persist failures are logged and swallowed. The in-memory
//!     state stands even when the write fails, so memory and storage can
//!     diverge until the next successful write.

use crate::{error::LumaResult, kv::SharedKv};
use serde::{de::DeserializeOwned, Serialize};

pub struct Collection<T> {
    key: String,
    kv: SharedKv,
    items: Vec<T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Read and parse the array stored under `key`.
    /// Absent, unreadable or malformed data all yield an empty collection.
    pub fn load(kv: SharedKv, key: &str) -> Self {
        let items = match kv.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    log::error!("Failed to parse stored '{key}': {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("Failed to read '{key}': {e}");
                Vec::new()
            }
        };
        log::debug!("Loaded {} records from '{key}'", items.len());
        Self {
            key: key.to_string(),
            kv,
            items,
        }
    }

    /// Populate with demo records when empty. Returns true if seeding ran.
    pub fn seed_if_empty<F>(&mut self, seed: F) -> bool
    where
        F: FnOnce() -> Vec<T>,
    {
        if !self.items.is_empty() {
            return false;
        }
        self.items = seed();
        log::info!("Seeded '{}' with {} demo records", self.key, self.items.len());
        self.persist();
        true
    }

    /// Write the whole array. Errors propagate; most callers want `persist`.
    pub fn try_persist(&self) -> LumaResult<()> {
        let json = serde_json::to_string(&self.items)?;
        self.kv.set(&self.key, &json)
    }

    /// Write the whole array, logging (not returning) any failure.
    pub fn persist(&self) -> bool {
        match self.try_persist() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist '{}': {e}", self.key);
                false
            }
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find<P>(&self, pred: P) -> Option<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.items.iter().find(|item| pred(item))
    }

    /// Insert at the front ("latest first" stores) and persist.
    pub fn prepend(&mut self, item: T) {
        self.items.insert(0, item);
        self.persist();
    }

    /// Insert at the back and persist.
    pub fn append(&mut self, item: T) {
        self.items.push(item);
        self.persist();
    }

    /// Mutate the first record matching `pred` and persist.
    /// Returns None (and writes nothing) when no record matches.
    pub fn update_where<P, F, R>(&mut self, pred: P, mutate: F) -> Option<R>
    where
        P: Fn(&T) -> bool,
        F: FnOnce(&mut T) -> R,
    {
        let item = self.items.iter_mut().find(|item| pred(item))?;
        let out = mutate(item);
        self.persist();
        Some(out)
    }

    /// Remove the first record matching `pred` and persist.
    pub fn remove_where<P>(&mut self, pred: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        let idx = self.items.iter().position(|item| pred(item))?;
        let removed = self.items.remove(idx);
        self.persist();
        Some(removed)
    }
}
