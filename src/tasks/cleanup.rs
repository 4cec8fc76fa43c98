//! Background Maintenance Tasks
//!
//! Periodic reconciliation of the response directory and purging of expired
//! object cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CachingMarketplaceService;
use crate::persist::PersistentResponseStore;
use crate::service::MarketplaceService;

/// Spawns a task that reconciles `store` with its directory every
/// `interval`, deleting orphaned data files.
///
/// Disk work runs on the blocking pool. The task ends on its own once the
/// store has been closed or shut down; abort the handle to stop it earlier.
pub fn spawn_reconcile_task(
    store: Arc<PersistentResponseStore>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "starting response store reconcile task");

        loop {
            tokio::time::sleep(interval).await;
            if !store.is_active() {
                debug!("response store inactive, stopping reconcile task");
                break;
            }

            let task_store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || task_store.reconcile()).await {
                Ok(0) => debug!("reconcile: no orphaned files"),
                Ok(removed) => info!(removed, "reconcile: removed orphaned files"),
                Err(err) => warn!(%err, "reconcile task failed"),
            }
        }
    })
}

/// Spawns a task that drops expired entries from the object cache every
/// `interval`. Expired entries already count as misses; purging only frees
/// their memory early.
pub fn spawn_purge_task<S>(
    service: Arc<CachingMarketplaceService<S>>,
    interval: Duration,
) -> JoinHandle<()>
where
    S: MarketplaceService + 'static,
{
    tokio::spawn(async move {
        info!(?interval, "starting object cache purge task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = service.purge_expired().await;
            if removed > 0 {
                info!(removed, "purge: removed expired objects");
            } else {
                debug!("purge: no expired objects");
            }
        }
    })
}
