//! Cleanup Tasks
//!
//! Background tasks that periodically sweep expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::MemoryCache;
use crate::durable::DurableCache;

/// Spawns a task that sweeps a durable cache every
/// [`DurableCache::cleanup_interval`].
///
/// The sweep touches storage, so each pass runs on the blocking pool. The
/// task loops until aborted through the returned handle.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(DurableCache::new(config, storage)?);
/// let handle = spawn_durable_cleanup_task(cache.clone());
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_durable_cleanup_task(cache: Arc<DurableCache>) -> JoinHandle<()> {
    let interval = cache.cleanup_interval();
    tokio::spawn(async move {
        info!(
            prefix = %cache.prefix(),
            "Starting durable cleanup task with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let sweep = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || sweep.cleanup()).await {
                Ok(0) => debug!("Durable cleanup: no expired entries found"),
                Ok(removed) => debug!("Durable cleanup: removed {} entries", removed),
                Err(e) => warn!("Durable cleanup pass failed: {}", e),
            }
        }
    })
}

/// Spawns a task that periodically sweeps a shared memory cache.
///
/// Lazy expiry already hides expired entries from readers; this only
/// reclaims their memory sooner.
pub fn spawn_memory_cleanup_task<V>(
    cache: Arc<Mutex<MemoryCache<V>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!("Starting memory cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.lock().cleanup();
            if removed > 0 {
                info!("Memory cleanup: removed {} expired entries", removed);
            } else {
                debug!("Memory cleanup: no expired entries found");
            }
        }
    })
}
