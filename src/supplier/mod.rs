//! Pool supplier collaborator: paginated fetches from the document store.
//! Transport failures are surfaced to the caller; the rotation engine never
//! sees them.

pub mod http;

use std::future::Future;

use tracing::{debug, warn};

use crate::config::MAX_SUPPLIER_PAGES;
use crate::error::{AppError, Result};
use crate::types::{Entry, ListingTier, Page, Pools};

pub use http::HttpSupplier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Primary and boosted entries.
    Launches,
    Premium,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Launches => "launches",
            Collection::Premium => "premium",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

pub trait PoolSupplier: Send + Sync {
    /// One page of `collection`, starting at `cursor` (None = first page).
    fn fetch_page(
        &self,
        collection: Collection,
        cursor: Option<String>,
        page_size: usize,
    ) -> impl Future<Output = Result<Page>> + Send;
}

/// Walks every page of `collection` in supplier order.
pub async fn fetch_collection<S: PoolSupplier>(
    supplier: &S,
    collection: Collection,
    page_size: usize,
) -> Result<Vec<Entry>> {
    let mut items = Vec::new();
    let mut cursor = None;

    for page_no in 0..MAX_SUPPLIER_PAGES {
        let page = supplier.fetch_page(collection, cursor.take(), page_size).await?;
        debug!(%collection, page_no, items = page.items.len(), "Fetched supplier page");
        items.extend(page.items);

        match page.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => return Ok(items),
        }
    }

    Err(AppError::Supplier(format!(
        "{collection} did not finish within {MAX_SUPPLIER_PAGES} pages"
    )))
}

#[derive(Debug, Clone, Default)]
pub struct PrimaryAndBoosted {
    pub primary: Vec<Entry>,
    pub boosted: Vec<Entry>,
}

pub async fn fetch_primary_and_boosted<S: PoolSupplier>(
    supplier: &S,
    page_size: usize,
) -> Result<PrimaryAndBoosted> {
    let entries = fetch_collection(supplier, Collection::Launches, page_size).await?;
    let (kept, stray) = keep_tiers(entries, |t| t != ListingTier::Premium);
    if stray > 0 {
        warn!(stray, "Launches collection returned premium entries; ignored");
    }
    let pools = Pools::partition(kept);
    Ok(PrimaryAndBoosted {
        primary: pools.primary,
        boosted: pools.boosted,
    })
}

pub async fn fetch_premium<S: PoolSupplier>(supplier: &S, page_size: usize) -> Result<Vec<Entry>> {
    let entries = fetch_collection(supplier, Collection::Premium, page_size).await?;
    let (kept, stray) = keep_tiers(entries, |t| t == ListingTier::Premium);
    if stray > 0 {
        warn!(stray, "Premium collection returned non-premium entries; ignored");
    }
    Ok(kept)
}

/// Fetches both collections concurrently into one tiered snapshot. An id
/// present in both (mid-moderation) stays premium.
pub async fn fetch_pools<S: PoolSupplier>(supplier: &S, page_size: usize) -> Result<Pools> {
    let (regular, premium) = tokio::try_join!(
        fetch_primary_and_boosted(supplier, page_size),
        fetch_premium(supplier, page_size),
    )?;

    Ok(Pools::partition(
        premium
            .into_iter()
            .chain(regular.primary)
            .chain(regular.boosted),
    ))
}

fn keep_tiers(entries: Vec<Entry>, keep: impl Fn(ListingTier) -> bool) -> (Vec<Entry>, usize) {
    let total = entries.len();
    let kept: Vec<Entry> = entries.into_iter().filter(|e| keep(e.listing_tier)).collect();
    let stray = total - kept.len();
    (kept, stray)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-memory supplier serving fixed collections in `page_size` chunks.
    /// Cursors are stringified offsets.
    #[derive(Default)]
    pub struct FakeSupplier {
        pub collections: Mutex<HashMap<&'static str, Vec<Entry>>>,
        pub fail: std::sync::atomic::AtomicBool,
        pub calls: AtomicUsize,
    }

    impl FakeSupplier {
        pub fn new(launches: Vec<Entry>, premium: Vec<Entry>) -> Self {
            let s = Self::default();
            s.set(launches, premium);
            s
        }

        pub fn set(&self, launches: Vec<Entry>, premium: Vec<Entry>) {
            let mut c = self.collections.lock().unwrap();
            c.insert("launches", launches);
            c.insert("premium", premium);
        }
    }

    impl PoolSupplier for FakeSupplier {
        async fn fetch_page(
            &self,
            collection: Collection,
            cursor: Option<String>,
            page_size: usize,
        ) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Supplier("document store unavailable".to_string()));
            }
            let all = self
                .collections
                .lock()
                .unwrap()
                .get(collection.path())
                .cloned()
                .unwrap_or_default();
            let start: usize = cursor.map_or(0, |c| c.parse().unwrap());
            let end = (start + page_size).min(all.len());
            Ok(Page {
                items: all[start..end].to_vec(),
                next_cursor: (end < all.len()).then(|| end.to_string()),
            })
        }
    }
}
