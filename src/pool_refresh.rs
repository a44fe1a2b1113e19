use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::config::POOL_REFRESH_INTERVAL_SECS;
use crate::db::EntryArchive;
use crate::error::Result;
use crate::rotation::now_ms;
use crate::state::{ListingStore, PoolDiff};
use crate::supplier::{fetch_pools, PoolSupplier};

/// Background task: pulls fresh pools from the supplier, archives them and
/// swaps them into the store. The listing driver picks the change up.
pub struct PoolRefresher<S> {
    supplier: Arc<S>,
    page_size: usize,
    store: Arc<ListingStore>,
    archive: EntryArchive,
    health: Arc<HealthState>,
}

impl<S: PoolSupplier> PoolRefresher<S> {
    pub fn new(
        supplier: Arc<S>,
        page_size: usize,
        store: Arc<ListingStore>,
        archive: EntryArchive,
        health: Arc<HealthState>,
    ) -> Self {
        Self { supplier, page_size, store, archive, health }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(POOL_REFRESH_INTERVAL_SECS));
        ticker.tick().await; // skip immediate first tick, bootstrap already ran

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                error!("Pool refresh failed: {e}");
            }
        }
    }

    pub async fn refresh(&self) -> Result<PoolDiff> {
        let pools = match fetch_pools(&*self.supplier, self.page_size).await {
            Ok(p) => p,
            Err(e) => {
                self.health.set_supplier_ok(false);
                return Err(e);
            }
        };

        let now = now_ms();
        if let Err(e) = self.archive.upsert_entries(pools.iter(), now).await {
            // Ranking history lags one refresh; the live listing is unaffected.
            warn!("Archive write failed: {e}");
        }

        let diff = self.store.replace_pools(pools);

        // Report what the store now serves.
        let current = self.store.pools();
        if current.is_empty() {
            warn!("Supplier returned no entries; listing is empty");
        }
        self.health.set_supplier_ok(true);
        self.health.set_last_refresh_at_ms(now);
        self.health.set_pool_sizes(current.premium.len(), current.primary.len(), current.boosted.len());

        info!(
            added = diff.added,
            removed = diff.removed,
            unchanged = diff.unchanged,
            indexed = self.store.entry_count(),
            premium = current.premium.len(),
            primary = current.primary.len(),
            boosted = current.boosted.len(),
            "Pool refresh complete: +{} added, -{} removed, {} unchanged",
            diff.added,
            diff.removed,
            diff.unchanged,
        );

        Ok(diff)
    }
}
