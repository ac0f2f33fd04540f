//! In-Memory Cache Module
//!
//! Single-process cache backend: a HashMap of TTL entries behind a mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::{Cache, CacheEntry, CacheStats};
use crate::error::{Result, TaskError};

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

// == Memory Cache ==
/// Process-local cache backend.
#[derive(Debug, Default)]
pub struct MemoryCache {
    state: Mutex<CacheState>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>> {
        self.state
            .lock()
            .map_err(|_| TaskError::Cache("cache lock poisoned".to_string()))
    }

    // == Contains ==
    /// Returns true if an unexpired entry exists under `key`.
    ///
    /// Does not count as a read in the statistics.
    pub fn contains(&self, key: &str) -> bool {
        self.lock()
            .map(|state| {
                state
                    .entries
                    .get(key)
                    .map(|entry| !entry.is_expired())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        match self.lock() {
            Ok(state) => {
                let mut stats = state.stats.clone();
                stats.set_total_entries(state.entries.len());
                stats
            }
            Err(_) => CacheStats::new(),
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number of entries removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut state = self.lock()?;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired());
        let removed = before - state.entries.len();

        state.stats.record_expirations(removed);
        let len = state.entries.len();
        state.stats.set_total_entries(len);
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.lock()?;

        let value = match state.entries.get(key).map(|entry| entry.is_expired()) {
            Some(false) => state.entries.get(key).map(|entry| entry.value.clone()),
            Some(true) => {
                state.entries.remove(key);
                state.stats.record_expirations(1);
                None
            }
            None => None,
        };

        if value.is_some() {
            state.stats.record_hit();
        } else {
            state.stats.record_miss();
        }
        let len = state.entries.len();
        state.stats.set_total_entries(len);

        Ok(value)
    }

    fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut state = self.lock()?;
        state
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        let len = state.entries.len();
        state.stats.set_total_entries(len);
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        let mut state = self.lock()?;
        if state.entries.remove(key).is_some() {
            state.stats.record_invalidation();
        }
        let len = state.entries.len();
        state.stats.set_total_entries(len);
        Ok(())
    }
}
