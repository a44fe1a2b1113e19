use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::health::HealthState;
use crate::api::latency::{PublishKind, PublishLatency};
use crate::listing::pipeline::{appended_tail, build_listing, Listing};
use crate::rotation::RotationClock;
use crate::types::{Entry, Pools};

/// Recomputes listings and hands them to the render sinks (API, feed).
///
/// Holds only the last computed listing; it is a disposable cache.
#[derive(Clone)]
pub struct ListingPublisher {
    clock: RotationClock,
    tx: Arc<watch::Sender<Arc<Listing>>>,
    latency: Arc<PublishLatency>,
    health: Arc<HealthState>,
}

impl ListingPublisher {
    pub fn new(clock: RotationClock, latency: Arc<PublishLatency>, health: Arc<HealthState>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Listing::empty(&clock, 0)));
        Self {
            clock,
            tx: Arc::new(tx),
            latency,
            health,
        }
    }

    pub fn clock(&self) -> RotationClock {
        self.clock
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Listing>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<Listing> {
        self.tx.borrow().clone()
    }

    /// Full recompute from `pools` for the epoch containing `now_ms`.
    pub fn publish(&self, pools: &Pools, now_ms: u64) -> Arc<Listing> {
        let started = Instant::now();
        let listing = Arc::new(build_listing(pools, &self.clock, now_ms));
        let elapsed = started.elapsed();
        self.latency.record_publish(PublishKind::Recompute, elapsed);
        self.send(Arc::clone(&listing));

        info!(
            epoch = listing.epoch,
            items = listing.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "Listing published for epoch {}",
            listing.epoch,
        );
        listing
    }

    /// Publishes `new` given that the current listing was built from `old`.
    ///
    /// Within the same epoch, if `new` only appended primary/boosted entries,
    /// the appended ones are added after the current items so nothing a viewer
    /// already saw moves. Anything else is a full recompute.
    pub fn publish_update(&self, old: &Pools, new: &Pools, now_ms: u64) -> Arc<Listing> {
        let current = self.current();
        if current.epoch != self.clock.epoch_for(now_ms) || !same_ids(&old.premium, &new.premium) {
            return self.publish(new, now_ms);
        }

        let tails = appended_tail(&old.primary, &new.primary)
            .zip(appended_tail(&old.boosted, &new.boosted));
        let Some((primary_tail, boosted_tail)) = tails else {
            return self.publish(new, now_ms);
        };

        let started = Instant::now();
        let mut next = (*current).clone();
        next.refresh_entries(new);
        next.extend_with(primary_tail, boosted_tail);
        let listing = Arc::new(next);
        self.latency.record_publish(PublishKind::Extend, started.elapsed());
        self.send(Arc::clone(&listing));

        debug!(
            epoch = listing.epoch,
            appended = primary_tail.len() + boosted_tail.len(),
            "Listing extended in place",
        );
        listing
    }

    fn send(&self, listing: Arc<Listing>) {
        self.tx.send_replace(listing);
        self.health.inc_publishes();
    }
}

fn same_ids(a: &[Entry], b: &[Entry]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
}
