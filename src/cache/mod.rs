//! Cache Module
//!
//! Read-through caching for task reads with TTL expiration and explicit
//! invalidation. The cache is best-effort: it may serve data up to one TTL
//! old and is never treated as the source of truth.

mod entry;
mod memory;
mod stats;


use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryCache;
pub use stats::CacheStats;

// == Cache Keys ==
/// Key holding the full list of active tasks.
pub const LIST_KEY: &str = "tasks:index";

/// Key holding a single task.
pub fn task_key(id: &str) -> String {
    format!("task:{}", id)
}

// == Cache Trait ==
/// Key/value cache holding serialized values with a per-entry TTL.
///
/// Implementations must be safe to call from many threads at once; each
/// call is atomic from the caller's point of view.
pub trait Cache: Send + Sync {
    /// Returns the value under `key` if present and unexpired.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Removes the entry under `key`. Absent keys are not an error.
    fn invalidate(&self, key: &str) -> Result<()>;
}

impl dyn Cache {
    // == Get Or Compute ==
    /// Returns the cached value for `key`, or runs `compute` and caches its result.
    ///
    /// A failing `compute` caches nothing and its error is returned. Cache
    /// faults never fail the call: a broken read falls through to `compute`
    /// and a broken write only logs.
    pub fn get_or_compute<T, F>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        match self.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("cache hit: {}", key);
                    return Ok(value);
                }
                Err(e) => warn!("discarding undecodable cache entry {}: {}", key, e),
            },
            Ok(None) => debug!("cache miss: {}", key),
            Err(e) => warn!("cache read failed for {}, reading through: {}", key, e),
        }

        let value = compute()?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.put(key, raw, ttl) {
                    warn!("cache write failed for {}: {}", key, e);
                }
            }
            Err(e) => warn!("could not encode {} for caching: {}", key, e),
        }

        Ok(value)
    }

    // == Forget ==
    /// Invalidates every key given, logging (not returning) cache faults.
    pub fn forget(&self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.invalidate(key) {
                warn!("cache invalidation failed for {}: {}", key, e);
            }
        }
    }
}
