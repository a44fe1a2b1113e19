use crate::config::MIN_BOOSTED_SPACING;
use crate::types::{Entry, ListingItem, ListingTier};

/// Render key: `{tier}-{id}-{positionOrReason}-{epochTimestamp}`.
pub fn unique_key(tier: ListingTier, id: &str, position: impl std::fmt::Display, epoch_ts: u64) -> String {
    format!("{tier}-{id}-{position}-{epoch_ts}")
}

/// Primary entries between consecutive boosted insertions.
#[inline]
pub fn boosted_spacing(primary_len: usize, boosted_len: usize) -> usize {
    if boosted_len == 0 {
        return MIN_BOOSTED_SPACING;
    }
    (primary_len / boosted_len).max(MIN_BOOSTED_SPACING)
}

/// Splice position for the k-th of `remaining` leftover boosted entries:
/// `floor(len * (k + 1) / (remaining - k + 1))`, clamped to the end.
///
/// Exact integer arithmetic on purpose; `len / (r - k + 1) * (k + 1)` in
/// floats rounds down a slot whenever the quotient is inexact.
#[inline]
fn fallback_index(built_len: usize, remaining: usize, k: usize) -> usize {
    (built_len * (k + 1) / (remaining - k + 1)).min(built_len)
}

fn tag_all(entries: &[Entry], tier: ListingTier, epoch_ts: u64) -> Vec<ListingItem> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| ListingItem::new(e.clone(), unique_key(tier, &e.id, i, epoch_ts)))
        .collect()
}

/// Merges already-rotated boosted entries into already-rotated primary
/// entries.
///
/// Walks `primary` in order and drops the next boosted entry after every
/// `spacing`-th primary one. Boosted entries the walk has no slot for (only
/// when `boosted > primary / 2`) are spliced in proportionally, see
/// [`fallback_index`].
///
/// Output length is always `primary.len() + boosted.len()`, primary order is
/// preserved, boosted order is preserved for the walk portion. When
/// `primary.len() >= 2 * boosted.len()` no two boosted entries are adjacent
/// and none leads the list.
pub fn interleave(primary: &[Entry], boosted: &[Entry], epoch_ts: u64) -> Vec<ListingItem> {
    if boosted.is_empty() {
        return tag_all(primary, ListingTier::Primary, epoch_ts);
    }
    if primary.is_empty() {
        return tag_all(boosted, ListingTier::Boosted, epoch_ts);
    }

    let spacing = boosted_spacing(primary.len(), boosted.len());
    let mut out = Vec::with_capacity(primary.len() + boosted.len());
    let mut cursor = 0usize;

    for (i, entry) in primary.iter().enumerate() {
        out.push(ListingItem::new(
            entry.clone(),
            unique_key(ListingTier::Primary, &entry.id, i, epoch_ts),
        ));
        if (i + 1) % spacing == 0 && cursor < boosted.len() {
            let b = &boosted[cursor];
            out.push(ListingItem::new(
                b.clone(),
                unique_key(ListingTier::Boosted, &b.id, cursor, epoch_ts),
            ));
            cursor += 1;
        }
    }

    let remaining = &boosted[cursor..];
    for (k, entry) in remaining.iter().enumerate() {
        let item = ListingItem::new(
            entry.clone(),
            unique_key(ListingTier::Boosted, &entry.id, format_args!("remaining-{k}"), epoch_ts),
        );
        let at = fallback_index(out.len(), remaining.len(), k);
        out.insert(at, item);
    }

    out
}
