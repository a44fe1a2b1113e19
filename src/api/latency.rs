//! Time from pool snapshot to broadcast listing, per publish.
//!
//! Full recomputes (rotate + interleave) and in-place extensions are counted
//! separately and share one microsecond histogram.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

/// Publishes slower than this are clamped into the top bucket.
const MAX_TRACKED_US: u64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    Recompute,
    Extend,
}

/// Point-in-time view served on `/stats/latency`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySnapshot {
    pub samples: u64,
    pub recomputes: u64,
    pub extensions: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

pub struct PublishLatency {
    histogram: Mutex<Histogram<u64>>,
    recomputes: AtomicU64,
    extensions: AtomicU64,
}

impl PublishLatency {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKED_US, 3)
            .expect("constant histogram bounds are valid");
        Self {
            histogram: Mutex::new(histogram),
            recomputes: AtomicU64::new(0),
            extensions: AtomicU64::new(0),
        }
    }

    pub fn record_publish(&self, kind: PublishKind, elapsed: Duration) {
        let counter = match kind {
            PublishKind::Recompute => &self.recomputes,
            PublishKind::Extend => &self.extensions,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let us = u64::try_from(elapsed.as_micros())
            .unwrap_or(u64::MAX)
            .clamp(1, MAX_TRACKED_US);
        if let Ok(mut h) = self.histogram.lock() {
            let _ = h.record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let mut snap = LatencySnapshot {
            recomputes: self.recomputes.load(Ordering::Relaxed),
            extensions: self.extensions.load(Ordering::Relaxed),
            ..LatencySnapshot::default()
        };
        let Ok(h) = self.histogram.lock() else {
            return snap;
        };
        snap.samples = h.len();
        if snap.samples > 0 {
            snap.p50_us = Some(h.value_at_quantile(0.5));
            snap.p95_us = Some(h.value_at_quantile(0.95));
            snap.p99_us = Some(h.value_at_quantile(0.99));
            snap.max_us = Some(h.max());
        }
        snap
    }
}

impl Default for PublishLatency {
    fn default() -> Self {
        Self::new()
    }
}
