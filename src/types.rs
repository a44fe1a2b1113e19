use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingTier {
    /// Always listed first, never rotated.
    Premium,
    /// Rotated and interleaved into the primary pool.
    Boosted,
    /// Regular entries, rotated.
    Primary,
}

impl ListingTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "premium" => Some(ListingTier::Premium),
            "boosted" => Some(ListingTier::Boosted),
            "primary" => Some(ListingTier::Primary),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ListingTier::Premium => "premium",
            ListingTier::Boosted => "boosted",
            ListingTier::Primary => "primary",
        };
        write!(f, "{s}")
    }
}

/// A submitted launch. Never mutated by the rotation engine, only reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub listing_tier: ListingTier,
    #[serde(default)]
    pub score: Option<f64>,
    pub effective_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Derived output
// ---------------------------------------------------------------------------

/// An entry as placed in a listing. `unique_key` only disambiguates render
/// rows within an epoch; it is not an identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingItem {
    pub unique_key: String,
    #[serde(flatten)]
    pub entry: Entry,
}

impl ListingItem {
    pub fn new(entry: Entry, unique_key: String) -> Self {
        Self { unique_key, entry }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    /// 1-based.
    pub rank: usize,
    #[serde(flatten)]
    pub entry: Entry,
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// Tier-partitioned snapshot of everything the supplier returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pools {
    pub premium: Vec<Entry>,
    pub primary: Vec<Entry>,
    pub boosted: Vec<Entry>,
}

impl Pools {
    /// Groups entries by tier, keeping supplier order. Duplicate ids (e.g. from
    /// overlapping pages) keep their first occurrence.
    pub fn partition(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut seen = HashSet::new();
        let mut pools = Pools::default();
        for entry in entries {
            if !seen.insert(entry.id.clone()) {
                continue;
            }
            match entry.listing_tier {
                ListingTier::Premium => pools.premium.push(entry),
                ListingTier::Boosted => pools.boosted.push(entry),
                ListingTier::Primary => pools.primary.push(entry),
            }
        }
        pools
    }

    pub fn len(&self) -> usize {
        self.premium.len() + self.primary.len() + self.boosted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.premium
            .iter()
            .chain(self.primary.iter())
            .chain(self.boosted.iter())
    }
}

// ---------------------------------------------------------------------------
// Supplier pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    pub items: Vec<Entry>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn partition_keeps_order_and_drops_duplicate_ids() {
        let entries = vec![
            entry("a", ListingTier::Primary),
            entry("x", ListingTier::Premium),
            entry("b", ListingTier::Boosted),
            entry("a", ListingTier::Boosted),
            entry("c", ListingTier::Primary),
        ];
        let pools = Pools::partition(entries);

        assert_eq!(pools.premium.len(), 1);
        assert_eq!(
            pools.primary.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(pools.boosted.len(), 1);
        assert_eq!(pools.boosted[0].id, "b");
        assert_eq!(pools.len(), 4);
    }

    #[test]
    fn tier_parses_its_display_form() {
        for tier in [ListingTier::Premium, ListingTier::Boosted, ListingTier::Primary] {
            assert_eq!(ListingTier::parse(&tier.to_string()), Some(tier));
        }
        assert_eq!(ListingTier::parse("regular"), None);
    }

    #[test]
    fn entry_deserializes_without_optional_fields() {
        let json = r#"{"id":"e1","listing_tier":"boosted","effective_date":"2026-10-12T00:00:00Z"}"#;
        let e: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(e.listing_tier, ListingTier::Boosted);
        assert!(e.score.is_none());
        assert!(e.name.is_empty());
    }
}
