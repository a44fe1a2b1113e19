use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::Serialize;

use crate::types::{Entry, RankedItem};

/// Unix day index of Monday 1970-01-05; periods are anchored on it.
const FIRST_MONDAY_DAY: i64 = 4;
const SECS_PER_DAY: i64 = 86_400;

/// Inclusive `[start, end]` time range a ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RankWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// The full period before the one `now` falls in.
///
/// Periods are `period_days` long and aligned to Mondays, so with 7 days this
/// is "last week": Monday 00:00:00.000 through Sunday 23:59:59.999 UTC.
pub fn prior_period_window(now: DateTime<Utc>, period_days: i64) -> RankWindow {
    let period_days = period_days.max(1);
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let day_index = midnight.timestamp().div_euclid(SECS_PER_DAY);
    let into_period = (day_index - FIRST_MONDAY_DAY).rem_euclid(period_days);

    let start = midnight - TimeDelta::days(into_period + period_days);
    let end = start + TimeDelta::days(period_days) - TimeDelta::milliseconds(1);
    RankWindow { start, end }
}

/// Top `n` entries whose `effective_date` falls inside `window`, by descending
/// score. Missing scores count as 0; equal scores keep input order.
pub fn top_n(entries: &[Entry], window: RankWindow, n: usize) -> Vec<RankedItem> {
    let mut candidates: Vec<&Entry> = entries
        .iter()
        .filter(|e| window.contains(e.effective_date))
        .collect();

    // sort_by is stable
    candidates.sort_by(|a, b| score(b).total_cmp(&score(a)));

    candidates
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, entry)| RankedItem { rank: i + 1, entry: entry.clone() })
        .collect()
}

#[inline]
fn score(entry: &Entry) -> f64 {
    entry.score.unwrap_or(0.0)
}
