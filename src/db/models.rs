use chrono::DateTime;

use crate::types::{Entry, ListingTier};

/// Row of the `entries` table (see migrations/).
#[derive(Debug, sqlx::FromRow)]
pub struct EntryRow {
    pub id: String,
    pub name: String,
    pub listing_tier: String,
    pub score: Option<f64>,
    pub effective_date_ms: i64,
}

impl EntryRow {
    /// None when the stored tier or timestamp can't be interpreted.
    pub fn into_entry(self) -> Option<Entry> {
        Some(Entry {
            listing_tier: ListingTier::parse(&self.listing_tier)?,
            effective_date: DateTime::from_timestamp_millis(self.effective_date_ms)?,
            id: self.id,
            name: self.name,
            score: self.score,
        })
    }
}
