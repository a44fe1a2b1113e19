use tracing::warn;

use crate::db::models::EntryRow;
use crate::error::Result;
use crate::ranking::RankWindow;
use crate::types::Entry;

/// Append-mostly history of supplied entries, kept in SQLite.
#[derive(Clone)]
pub struct EntryArchive {
    pool: sqlx::SqlitePool,
}

impl EntryArchive {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts new entries and refreshes tier/score/name of known ones.
    /// `first_seen_at_ms` is only written on insert.
    pub async fn upsert_entries<'a, I>(&self, entries: I, seen_at_ms: u64) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let entries: Vec<&Entry> = entries.into_iter().collect();
        let seen_at = seen_at_ms as i64;

        let mut tx = self.pool.begin().await?;
        for e in &entries {
            sqlx::query(
                r#"
                INSERT INTO entries (id, name, listing_tier, score, effective_date_ms, first_seen_at_ms, last_seen_at_ms)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    listing_tier = excluded.listing_tier,
                    score = excluded.score,
                    effective_date_ms = excluded.effective_date_ms,
                    last_seen_at_ms = excluded.last_seen_at_ms
                "#,
            )
            .bind(&e.id)
            .bind(&e.name)
            .bind(e.listing_tier.to_string())
            .bind(e.score)
            .bind(e.effective_date.timestamp_millis())
            .bind(seen_at)
            .bind(seen_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(entries.len())
    }

    /// Entries whose effective date lies in `window`, in first-seen order.
    pub async fn entries_between(&self, window: RankWindow) -> Result<Vec<Entry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, name, listing_tier, score, effective_date_ms
            FROM entries
            WHERE effective_date_ms BETWEEN ? AND ?
            ORDER BY first_seen_at_ms ASC, rowid ASC
            "#,
        )
        .bind(window.start.timestamp_millis())
        .bind(window.end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        let total = rows.len();
        let entries: Vec<Entry> = rows.into_iter().filter_map(EntryRow::into_entry).collect();
        if entries.len() < total {
            warn!(skipped = total - entries.len(), "Archive rows with unreadable tier or date skipped");
        }
        Ok(entries)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
