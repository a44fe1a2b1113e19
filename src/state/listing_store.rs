use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::types::{Entry, Pools};

/// Outcome of swapping in a fresh pool snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolDiff {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Whether subscribers were notified (snapshot actually differed).
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// ListingStore
// ---------------------------------------------------------------------------

/// Latest supplier snapshot. Readers get an immutable `Arc<Pools>`; the
/// snapshot is replaced wholesale, never mutated in place.
pub struct ListingStore {
    /// entry id → Entry, across all tiers
    entries: DashMap<String, Entry>,
    pools_tx: watch::Sender<Arc<Pools>>,
}

impl ListingStore {
    pub fn new() -> Arc<Self> {
        let (pools_tx, _rx) = watch::channel(Arc::new(Pools::default()));
        Arc::new(Self {
            entries: DashMap::new(),
            pools_tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Pools>> {
        self.pools_tx.subscribe()
    }

    pub fn pools(&self) -> Arc<Pools> {
        self.pools_tx.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Replaces the snapshot. Subscribers only hear about it when something
    /// (order, membership or entry fields) differs from the current one.
    pub fn replace_pools(&self, pools: Pools) -> PoolDiff {
        let incoming: HashSet<&str> = pools.iter().map(|e| e.id.as_str()).collect();

        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|r| !incoming.contains(r.key().as_str()))
            .map(|r| r.key().clone())
            .collect();
        for id in &stale {
            self.entries.remove(id);
        }

        let mut added = 0usize;
        for entry in pools.iter() {
            if self.entries.insert(entry.id.clone(), entry.clone()).is_none() {
                added += 1;
            }
        }

        let unchanged = incoming.len().saturating_sub(added);

        let changed = **self.pools_tx.borrow() != pools;
        if changed {
            self.pools_tx.send_replace(Arc::new(pools));
        }

        PoolDiff {
            added,
            removed: stale.len(),
            unchanged,
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::{boosted, primary};

    fn pools(p: &[&str], b: &[&str]) -> Pools {
        Pools {
            primary: primary(p),
            boosted: boosted(b),
            ..Default::default()
        }
    }

    #[test]
    fn replace_reports_added_removed_and_unchanged() {
        let store = ListingStore::new();

        let diff = store.replace_pools(pools(&["p1", "p2"], &["b1"]));
        assert_eq!(diff, PoolDiff { added: 3, removed: 0, unchanged: 0, changed: true });

        let diff = store.replace_pools(pools(&["p2", "p3"], &["b1"]));
        assert_eq!(diff, PoolDiff { added: 1, removed: 1, unchanged: 2, changed: true });

        assert!(store.get("p1").is_none());
        assert!(store.get("p3").is_some());
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn identical_snapshot_does_not_notify() {
        let store = ListingStore::new();
        let mut rx = store.subscribe();

        store.replace_pools(pools(&["p1"], &[]));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        let diff = store.replace_pools(pools(&["p1"], &[]));
        assert!(!diff.changed);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn score_change_notifies_and_updates_index() {
        let store = ListingStore::new();
        store.replace_pools(pools(&["p1"], &[]));

        let mut rescored = pools(&["p1"], &[]);
        rescored.primary[0].score = Some(9.0);
        let diff = store.replace_pools(rescored);

        assert!(diff.changed);
        assert_eq!(store.get("p1").unwrap().score, Some(9.0));
        assert_eq!(store.pools().primary[0].score, Some(9.0));
    }
}
