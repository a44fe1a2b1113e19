use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ROTATION_INTERVAL_MS;

/// Maps wall-clock milliseconds onto fixed-width rotation epochs.
///
/// Every observer inside the same interval computes the same epoch, so the
/// epoch is the only input rotation needs. Pure; holds no state but the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationClock {
    interval_ms: u64,
}

impl Default for RotationClock {
    fn default() -> Self {
        Self::new(ROTATION_INTERVAL_MS)
    }
}

impl RotationClock {
    pub const fn new(interval_ms: u64) -> Self {
        assert!(interval_ms > 0, "rotation interval must be non-zero");
        Self { interval_ms }
    }

    #[inline]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// `floor(now / interval)`.
    #[inline]
    pub fn epoch_for(&self, now_ms: u64) -> u64 {
        now_ms / self.interval_ms
    }

    /// Millisecond timestamp at which `epoch` began.
    #[inline]
    pub fn epoch_start_ms(&self, epoch: u64) -> u64 {
        epoch.saturating_mul(self.interval_ms)
    }

    /// `ceil(now / interval) * interval - now`. Zero exactly on a boundary.
    /// Display and timer scheduling only; ordering never depends on it.
    #[inline]
    pub fn millis_until_next_epoch(&self, now_ms: u64) -> u64 {
        let rem = now_ms % self.interval_ms;
        if rem == 0 {
            0
        } else {
            self.interval_ms - rem
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
