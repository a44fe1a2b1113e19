use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::listing::publisher::ListingPublisher;
use crate::rotation::{now_ms, RotationClock};
use crate::schedule::ScheduleTimer;
use crate::types::Pools;

/// Wall-clock reading in epoch milliseconds.
pub type TimeSource = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Owns the epoch timer. Publishes whenever the pool snapshot changes and,
/// through the timer, at every epoch boundary in between.
pub struct ListingDriver {
    clock: RotationClock,
    publisher: ListingPublisher,
    pools_rx: watch::Receiver<Arc<Pools>>,
    timer: ScheduleTimer,
    now: TimeSource,
}

impl ListingDriver {
    pub fn new(publisher: ListingPublisher, pools_rx: watch::Receiver<Arc<Pools>>) -> Self {
        Self::with_time_source(publisher, pools_rx, Arc::new(now_ms))
    }

    pub fn with_time_source(
        publisher: ListingPublisher,
        pools_rx: watch::Receiver<Arc<Pools>>,
        now: TimeSource,
    ) -> Self {
        let clock = publisher.clock();
        Self {
            clock,
            publisher,
            pools_rx,
            timer: ScheduleTimer::new(clock),
            now,
        }
    }

    pub async fn run(mut self) {
        let mut previous: Option<Arc<Pools>> = None;

        loop {
            let pools = Arc::clone(&self.pools_rx.borrow_and_update());
            let now = (self.now)();

            match &previous {
                Some(prev) => self.publisher.publish_update(prev, &pools, now),
                None => self.publisher.publish(&pools, now),
            };
            self.rearm(Arc::clone(&pools), now);
            previous = Some(pools);

            if self.pools_rx.changed().await.is_err() {
                info!("Pool channel closed, listing driver stopping");
                break;
            }
        }

        self.timer.cancel();
    }

    /// Points the epoch timer at `pools`, cancelling the timer that held the
    /// previous snapshot.
    fn rearm(&mut self, pools: Arc<Pools>, now: u64) {
        let publisher = self.publisher.clone();
        let wall_clock = Arc::clone(&self.now);
        let interval = self.clock.interval_ms();
        let mut boundary = now + self.clock.millis_until_next_epoch(now);

        self.timer.subscribe(now, move || {
            // tokio's monotonic timer can wake a hair before the wall clock
            // crosses the boundary; never publish for the epoch just ended.
            let at = wall_clock().max(boundary);
            boundary += interval;
            publisher.publish(&pools, at);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::{sleep, Instant};

    use crate::api::health::HealthState;
    use crate::api::latency::PublishLatency;
    use crate::config::ROTATION_INTERVAL_MS as I;
    use crate::listing::pipeline::{build_listing, Listing};
    use crate::types::test_support::{boosted, ids, primary};

    fn publisher_with(health: Arc<HealthState>) -> ListingPublisher {
        ListingPublisher::new(RotationClock::default(), Arc::new(PublishLatency::new()), health)
    }

    fn publisher() -> ListingPublisher {
        publisher_with(Arc::new(HealthState::new()))
    }

    async fn next_listing(rx: &mut watch::Receiver<Arc<Listing>>, within: Duration) -> Arc<Listing> {
        tokio::time::timeout(within, rx.changed())
            .await
            .expect("listing published in time")
            .expect("publisher alive");
        rx.borrow_and_update().clone()
    }

    /// Wall clock starting at `start_ms` that moves with tokio's (paused) clock.
    fn paused_wall_clock(start_ms: u64) -> TimeSource {
        let origin = Instant::now();
        Arc::new(move || start_ms + origin.elapsed().as_millis() as u64)
    }

    #[tokio::test]
    async fn publishes_initial_and_changed_pools() {
        let publisher = publisher();
        let mut listings = publisher.subscribe();
        let (pools_tx, pools_rx) = watch::channel(Arc::new(Pools::default()));

        let handle = tokio::spawn(ListingDriver::new(publisher.clone(), pools_rx).run());

        let first = next_listing(&mut listings, Duration::from_secs(5)).await;
        assert!(first.items.is_empty());

        pools_tx.send_replace(Arc::new(Pools {
            primary: primary(&["p1", "p2", "p3", "p4"]),
            boosted: boosted(&["b1"]),
            ..Default::default()
        }));
        let second = next_listing(&mut listings, Duration::from_secs(5)).await;
        let mut got = ids(&second.items);
        got.sort_unstable();
        assert_eq!(got, vec!["b1", "p1", "p2", "p3", "p4"]);

        drop(pools_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("driver stops when pools channel closes")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_republishes_latest_snapshot_only() {
        let health = Arc::new(HealthState::new());
        let publisher = publisher_with(Arc::clone(&health));
        let mut listings = publisher.subscribe();
        let clock = publisher.clock();

        let old = Pools { primary: primary(&["p1", "p2", "p3"]), ..Default::default() };
        let new = Pools {
            primary: primary(&["q1", "q2", "q3", "q4"]),
            boosted: boosted(&["b1"]),
            ..Default::default()
        };
        let (pools_tx, pools_rx) = watch::channel(Arc::new(old));
        let wall_clock = paused_wall_clock(10 * I + I / 2);
        let handle = tokio::spawn(
            ListingDriver::with_time_source(publisher.clone(), pools_rx, wall_clock).run(),
        );

        let within = Duration::from_millis(2 * I);
        let first = next_listing(&mut listings, within).await;
        assert_eq!(first.epoch, 10);
        assert_eq!(ids(&first.items), vec!["p2", "p3", "p1"]);

        // Change pools mid-epoch; the timer armed for the old snapshot goes away.
        sleep(Duration::from_millis(I / 4)).await;
        pools_tx.send_replace(Arc::new(new.clone()));
        let changed = next_listing(&mut listings, within).await;
        assert_eq!(changed.epoch, 10);
        assert_eq!(changed.len(), 5);

        let at_boundary = next_listing(&mut listings, within).await;
        assert_eq!(at_boundary.epoch, 11);
        assert_eq!(*at_boundary, build_listing(&new, &clock, 11 * I));

        // One publish each for bootstrap, change and boundary; nothing from the old timer.
        sleep(Duration::from_millis(I / 2)).await;
        assert_eq!(health.publishes(), 3);
        assert!(!listings.has_changed().unwrap());

        drop(pools_tx);
        tokio::time::timeout(within, handle)
            .await
            .expect("driver stops when pools channel closes")
            .unwrap();
    }
}
