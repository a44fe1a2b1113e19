//! Shared health state for the /health endpoint.
//! Updated by PoolRefresher, ListingPublisher and the listing feed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared health metrics. Updated by service components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True when the last supplier fetch succeeded.
    pub supplier_ok: AtomicBool,
    /// Millisecond timestamp of the last successful pool refresh (0 = none).
    pub last_refresh_at_ms: AtomicU64,
    pub premium_entries: AtomicU64,
    pub primary_entries: AtomicU64,
    pub boosted_entries: AtomicU64,
    /// Open WebSocket feed connections.
    pub feed_clients: AtomicU64,
    /// Listings published since process start.
    pub publishes: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_supplier_ok(&self, v: bool) {
        self.supplier_ok.store(v, Ordering::Relaxed);
    }

    pub fn set_last_refresh_at_ms(&self, ms: u64) {
        self.last_refresh_at_ms.store(ms, Ordering::Relaxed);
    }

    pub fn set_pool_sizes(&self, premium: usize, primary: usize, boosted: usize) {
        self.premium_entries.store(premium as u64, Ordering::Relaxed);
        self.primary_entries.store(primary as u64, Ordering::Relaxed);
        self.boosted_entries.store(boosted as u64, Ordering::Relaxed);
    }

    pub fn inc_feed_clients(&self) {
        self.feed_clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_feed_clients(&self) {
        self.feed_clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn inc_publishes(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn supplier_ok(&self) -> bool {
        self.supplier_ok.load(Ordering::Relaxed)
    }

    pub fn last_refresh_at_ms(&self) -> u64 {
        self.last_refresh_at_ms.load(Ordering::Relaxed)
    }

    /// (premium, primary, boosted)
    pub fn pool_sizes(&self) -> (u64, u64, u64) {
        (
            self.premium_entries.load(Ordering::Relaxed),
            self.primary_entries.load(Ordering::Relaxed),
            self.boosted_entries.load(Ordering::Relaxed),
        )
    }

    pub fn feed_clients(&self) -> u64 {
        self.feed_clients.load(Ordering::Relaxed)
    }

    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }
}
