use std::collections::HashMap;

use serde::Serialize;

use crate::rotation::{interleave, rotate, unique_key, RotationClock};
use crate::types::{Entry, ListingItem, ListingTier, Pools};

/// Ordered output for one epoch: premium block, then rotated primary with
/// boosted entries interleaved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub epoch: u64,
    pub epoch_started_at_ms: u64,
    pub items: Vec<ListingItem>,
}

/// Runs clock -> rotate -> interleave over a pool snapshot. Pure.
pub fn build_listing(pools: &Pools, clock: &RotationClock, now_ms: u64) -> Listing {
    let epoch = clock.epoch_for(now_ms);
    let epoch_ts = clock.epoch_start_ms(epoch);

    let mut items = Vec::with_capacity(pools.len());
    items.extend(pools.premium.iter().enumerate().map(|(i, e)| {
        ListingItem::new(e.clone(), unique_key(ListingTier::Premium, &e.id, i, epoch_ts))
    }));

    let primary = rotate(&pools.primary, epoch);
    let boosted = rotate(&pools.boosted, epoch);
    items.extend(interleave(&primary, &boosted, epoch_ts));

    Listing { epoch, epoch_started_at_ms: epoch_ts, items }
}

/// `new` minus its leading `old` run, if `new` only appended to `old`.
pub fn appended_tail<'a>(old: &[Entry], new: &'a [Entry]) -> Option<&'a [Entry]> {
    if new.len() < old.len() {
        return None;
    }
    let prefix_matches = old.iter().zip(new).all(|(a, b)| a.id == b.id);
    prefix_matches.then(|| &new[old.len()..])
}

impl Listing {
    pub fn empty(clock: &RotationClock, now_ms: u64) -> Self {
        build_listing(&Pools::default(), clock, now_ms)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Appends a newly arrived page without moving anything already listed.
    /// The tail is rotated with this listing's own epoch.
    pub fn extend_with(&mut self, primary_tail: &[Entry], boosted_tail: &[Entry]) {
        let primary = rotate(primary_tail, self.epoch);
        let boosted = rotate(boosted_tail, self.epoch);
        self.items.extend(interleave(&primary, &boosted, self.epoch_started_at_ms));
    }

    /// Swaps in fresher copies of listed entries (score, name) by id. Order
    /// and keys are untouched.
    pub fn refresh_entries(&mut self, pools: &Pools) {
        let fresh: HashMap<&str, &Entry> = pools.iter().map(|e| (e.id.as_str(), e)).collect();
        for item in &mut self.items {
            if let Some(e) = fresh.get(item.entry.id.as_str()) {
                item.entry = (*e).clone();
            }
        }
    }

    /// Zero-based position of `id` in this listing.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.entry.id == id)
    }

    pub fn page(&self, offset: usize, limit: usize) -> &[ListingItem] {
        let start = offset.min(self.items.len());
        let end = start.saturating_add(limit).min(self.items.len());
        &self.items[start..end]
    }
}
