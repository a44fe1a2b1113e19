use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::rotation::RotationClock;

/// Cancellation handle for an armed epoch-boundary timer.
///
/// Not `Clone`: exactly one owner can cancel. Dropping the handle cancels
/// the timer as well.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Stops all future firings and releases the underlying task.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fires `callback` once at the next epoch boundary after `now_ms` and then
/// every interval. `callback` runs on the timer task and must not block.
///
/// Must be called from within a tokio runtime.
pub fn on_epoch_boundary<F>(clock: RotationClock, now_ms: u64, mut callback: F) -> TimerHandle
where
    F: FnMut() + Send + 'static,
{
    let delay = Duration::from_millis(clock.millis_until_next_epoch(now_ms));
    let period = Duration::from_millis(clock.interval_ms());

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            callback();
        }
    });

    TimerHandle { task }
}

/// Owner of at most one armed epoch-boundary timer.
///
/// Subscribing again cancels the previous timer first.
pub struct ScheduleTimer {
    clock: RotationClock,
    handle: Option<TimerHandle>,
}

impl ScheduleTimer {
    pub fn new(clock: RotationClock) -> Self {
        Self { clock, handle: None }
    }

    pub fn subscribe<F>(&mut self, now_ms: u64, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.cancel();
        let delay_ms = self.clock.millis_until_next_epoch(now_ms);
        self.handle = Some(on_epoch_boundary(self.clock, now_ms, callback));
        debug!(delay_ms, "Epoch timer armed");
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
            debug!("Epoch timer cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    const I: u64 = 60_000;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_next_boundary_then_every_interval() {
        let clock = RotationClock::new(I);
        let (count, cb) = counter();
        let _handle = on_epoch_boundary(clock, 5 * I - 1_000, cb);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(I)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        sleep(Duration::from_millis(3 * I)).await;
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handle_never_fires_again() {
        let clock = RotationClock::new(I);
        let (count, cb) = counter();
        let handle = on_epoch_boundary(clock, I - 10, cb);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.cancel();
        sleep(Duration::from_millis(5 * I)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribe_replaces_previous_timer() {
        let mut timer = ScheduleTimer::new(RotationClock::new(I));
        let (first, cb1) = counter();
        let (second, cb2) = counter();

        timer.subscribe(I / 2, cb1);
        timer.subscribe(I / 2, cb2);

        sleep(Duration::from_millis(2 * I)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_owner_releases_the_timer() {
        let mut timer = ScheduleTimer::new(RotationClock::new(I));
        let (count, cb) = counter();
        timer.subscribe(0, cb);

        sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "on-boundary subscribe fires immediately");

        drop(timer);
        sleep(Duration::from_millis(4 * I)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_on_idle_timer_is_a_no_op() {
        let mut timer = ScheduleTimer::new(RotationClock::new(I));
        timer.cancel();

        let (count, cb) = counter();
        timer.subscribe(3 * I + 1, cb);
        timer.cancel();
        timer.cancel();
        sleep(Duration::from_millis(2 * I)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
