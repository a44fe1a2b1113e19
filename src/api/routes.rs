use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::feed::ws_handler;
use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, PublishLatency};
use crate::config::{RANKED_PERIOD_DAYS, RANKED_WINDOW_SIZE};
use crate::db::EntryArchive;
use crate::error::AppError;
use crate::listing::ListingPublisher;
use crate::ranking::{prior_period_window, top_n, RankWindow};
use crate::rotation::now_ms;
use crate::state::ListingStore;
use crate::types::{Entry, ListingItem, ListingTier, RankedItem};

const DEFAULT_PAGE_LIMIT: usize = 50;
const MAX_PAGE_LIMIT: usize = 500;

#[derive(Clone)]
pub struct ApiState {
    pub publisher: ListingPublisher,
    pub store: Arc<ListingStore>,
    pub archive: EntryArchive,
    pub health: Arc<HealthState>,
    pub latency: Arc<PublishLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/launches", get(get_launches))
        .route("/launches/:id", get(get_launch))
        .route("/winners", get(get_winners))
        .route("/rotation", get(get_rotation))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct LaunchesQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct LaunchesResponse {
    pub epoch: u64,
    pub epoch_started_at_ms: u64,
    pub millis_until_next_epoch: u64,
    pub total: usize,
    pub offset: usize,
    pub items: Vec<ListingItem>,
}

#[derive(Debug, Serialize)]
pub struct LaunchResponse {
    pub entry: Entry,
    pub listing_tier: ListingTier,
    /// Zero-based position in the current listing; None until the next publish.
    pub position: Option<usize>,
    pub unique_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WinnersResponse {
    pub window: RankWindow,
    pub winners: Vec<RankedItem>,
}

#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub epoch: u64,
    pub epoch_started_at_ms: u64,
    pub millis_until_next_epoch: u64,
    pub interval_ms: u64,
    /// Epoch of the listing currently being served. Trails `epoch` briefly
    /// around a boundary.
    pub listing_epoch: u64,
    pub listing_len: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub supplier_ok: bool,
    pub last_refresh_at_ms: Option<u64>,
    pub premium_entries: u64,
    pub primary_entries: u64,
    pub boosted_entries: u64,
    pub feed_clients: u64,
    pub publishes: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_launches(
    State(state): State<ApiState>,
    Query(params): Query<LaunchesQuery>,
) -> Json<LaunchesResponse> {
    let listing = state.publisher.current();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);

    Json(LaunchesResponse {
        epoch: listing.epoch,
        epoch_started_at_ms: listing.epoch_started_at_ms,
        millis_until_next_epoch: state.publisher.clock().millis_until_next_epoch(now_ms()),
        total: listing.len(),
        offset,
        items: listing.page(offset, limit).to_vec(),
    })
}

async fn get_launch(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<LaunchResponse>, AppError> {
    let entry = state
        .store
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("launch {id}")))?;

    let listing = state.publisher.current();
    let position = listing.position_of(&id);
    let unique_key = position.map(|p| listing.items[p].unique_key.clone());

    Ok(Json(LaunchResponse {
        listing_tier: entry.listing_tier,
        entry,
        position,
        unique_key,
    }))
}

async fn get_winners(State(state): State<ApiState>) -> Result<Json<WinnersResponse>, AppError> {
    let window = prior_period_window(Utc::now(), RANKED_PERIOD_DAYS);
    let history = state.archive.entries_between(window).await?;
    let winners = top_n(&history, window, RANKED_WINDOW_SIZE);
    Ok(Json(WinnersResponse { window, winners }))
}

async fn get_rotation(State(state): State<ApiState>) -> Json<RotationResponse> {
    let clock = state.publisher.clock();
    let now = now_ms();
    let epoch = clock.epoch_for(now);
    let listing = state.publisher.current();

    Json(RotationResponse {
        epoch,
        epoch_started_at_ms: clock.epoch_start_ms(epoch),
        millis_until_next_epoch: clock.millis_until_next_epoch(now),
        interval_ms: clock.interval_ms(),
        listing_epoch: listing.epoch,
        listing_len: listing.len(),
    })
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    let (premium_entries, primary_entries, boosted_entries) = h.pool_sizes();
    let last_refresh = h.last_refresh_at_ms();

    Json(HealthResponse {
        supplier_ok: h.supplier_ok(),
        last_refresh_at_ms: (last_refresh > 0).then_some(last_refresh),
        premium_entries,
        primary_entries,
        boosted_entries,
        feed_clients: h.feed_clients(),
        publishes: h.publishes(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}


#[cfg(test)]
mod tests {
    use super::test_support::api_state;
    use super::*;
    use crate::types::test_support::{boosted, entry, primary};
    use crate::types::Pools;
    use axum::response::IntoResponse;
    use chrono::TimeDelta;

    fn pools() -> Pools {
        Pools {
            premium: vec![entry("vip", ListingTier::Premium)],
            primary: primary(&["p1", "p2", "p3", "p4"]),
            boosted: boosted(&["b1", "b2"]),
        }
    }

    async fn published_state() -> ApiState {
        let state = api_state().await;
        state.store.replace_pools(pools());
        state.publisher.publish(&state.store.pools(), now_ms());
        state
    }

    #[tokio::test]
    async fn launches_pages_the_current_listing() {
        let state = published_state().await;

        let Json(all) = get_launches(State(state.clone()), Query(LaunchesQuery::default())).await;
        assert_eq!(all.total, 7);
        assert_eq!(all.items.len(), 7);
        assert_eq!(all.items[0].entry.id, "vip");
        assert!(all.millis_until_next_epoch <= crate::config::ROTATION_INTERVAL_MS);

        let query = LaunchesQuery { offset: Some(5), limit: Some(10) };
        let Json(tail) = get_launches(State(state), Query(query)).await;
        assert_eq!(tail.offset, 5);
        assert_eq!(tail.items.len(), 2);
        assert_eq!(tail.items[..], all.items[5..]);
    }

    #[tokio::test]
    async fn launch_reports_position_and_key() {
        let state = published_state().await;

        let Json(vip) = get_launch(State(state.clone()), Path("vip".to_string())).await.unwrap();
        assert_eq!(vip.position, Some(0));
        assert_eq!(vip.listing_tier, ListingTier::Premium);
        assert!(vip.unique_key.unwrap().starts_with("premium-vip-0-"));

        let err = get_launch(State(state), Path("nope".to_string())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.into_response().status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn winners_rank_last_period_from_archive() {
        let state = api_state().await;
        let window = prior_period_window(Utc::now(), RANKED_PERIOD_DAYS);

        let mut low = entry("low", ListingTier::Primary);
        low.effective_date = window.start + TimeDelta::hours(1);
        low.score = Some(1.0);
        let mut high = entry("high", ListingTier::Boosted);
        high.effective_date = window.end;
        high.score = Some(9.0);
        let mut unscored = entry("unscored", ListingTier::Primary);
        unscored.effective_date = window.start;
        let mut current = entry("current", ListingTier::Primary);
        current.effective_date = window.end + TimeDelta::milliseconds(1);
        current.score = Some(100.0);
        let mut mid = entry("mid", ListingTier::Premium);
        mid.effective_date = window.start + TimeDelta::days(3);
        mid.score = Some(5.0);
        state
            .archive
            .upsert_entries([&low, &high, &unscored, &current, &mid], 1)
            .await
            .unwrap();

        let Json(resp) = get_winners(State(state)).await.unwrap();
        assert_eq!(resp.window, window);
        let ids: Vec<&str> = resp.winners.iter().map(|w| w.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        assert_eq!(resp.winners[0].rank, 1);
    }

    #[tokio::test]
    async fn rotation_and_health_reflect_state() {
        let state = published_state().await;
        state.health.set_pool_sizes(1, 4, 2);

        let Json(rot) = get_rotation(State(state.clone())).await;
        assert_eq!(rot.epoch_started_at_ms, rot.epoch * rot.interval_ms);
        assert!(rot.listing_epoch <= rot.epoch);
        assert_eq!(rot.listing_len, 7);

        let Json(health) = get_health(State(state.clone())).await;
        assert_eq!(health.primary_entries, 4);
        assert_eq!(health.last_refresh_at_ms, None);
        assert_eq!(health.publishes, 1);

        let Json(lat) = get_stats_latency(State(state)).await;
        assert_eq!(lat.samples, 1);
        assert_eq!(lat.recomputes, 1);
        assert!(lat.p50_us.is_some());
    }
}
