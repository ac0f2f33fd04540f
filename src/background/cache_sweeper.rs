//! Cache Sweeper
//!
//! Background task that periodically drops expired cache entries, so keys
//! for tasks nobody reads again do not linger until the next access.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::MemoryCache;

/// Spawns the sweeper loop.
///
/// # Returns
/// A JoinHandle which can be used to abort the task during graceful shutdown.
pub fn spawn_cache_sweeper(cache: Arc<MemoryCache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache sweeper with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired() {
                Ok(0) => debug!("Cache sweep: no expired entries found"),
                Ok(removed) => info!("Cache sweep: removed {} expired entries", removed),
                Err(e) => warn!("Cache sweep failed: {}", e),
            }
        }
    })
}
