use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Reconnect delays for the listing feed; the last value repeats.
const FEED_BACKOFF_MS: &[u64] = &[500, 1_000, 2_000, 5_000];

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EntryView {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub listing_tier: String,
    pub score: Option<f64>,
    pub effective_date: String,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct ListingItemView {
    pub unique_key: String,
    #[serde(flatten)]
    pub entry: EntryView,
}

/// Frame pushed on /ws.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListingView {
    pub epoch: u64,
    pub epoch_started_at_ms: u64,
    pub items: Vec<ListingItemView>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct RotationResponse {
    pub epoch: u64,
    pub epoch_started_at_ms: u64,
    pub millis_until_next_epoch: u64,
    pub interval_ms: u64,
    pub listing_epoch: u64,
    pub listing_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankedView {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: EntryView,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WindowView {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WinnersResponse {
    pub window: WindowView,
    pub winners: Vec<RankedView>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
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
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug)]
pub enum FeedEvent {
    Connected,
    Listing(ListingView),
    Disconnected(String),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub feed_status: ConnectionStatus,
    pub listing: ListingView,
    pub rotation: RotationResponse,
    /// When `rotation` was fetched; the countdown runs down from there.
    pub rotation_fetched_at: Instant,
    pub winners: WinnersResponse,
    pub health: HealthResponse,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            feed_status: ConnectionStatus::Connecting,
            listing: ListingView::default(),
            rotation: RotationResponse::default(),
            rotation_fetched_at: Instant::now(),
            winners: WinnersResponse::default(),
            health: HealthResponse::default(),
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let rotation_url = format!("{}/rotation", self.base_url);
        let winners_url = format!("{}/winners", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (rotation_res, winners_res, health_res) = tokio::join!(
            client.get(&rotation_url).send(),
            client.get(&winners_url).send(),
            client.get(&health_url).send(),
        );

        let rotation = match rotation_res {
            Ok(resp) => resp.json::<RotationResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        match rotation {
            Ok(r) => {
                self.rotation = r;
                self.rotation_fetched_at = Instant::now();
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(w) = winners_res {
            if let Ok(winners) = w.json::<WinnersResponse>().await {
                self.winners = winners;
            }
        }
        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
    }

    pub fn apply_feed(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => self.feed_status = ConnectionStatus::Connected,
            FeedEvent::Listing(listing) => {
                self.feed_status = ConnectionStatus::Connected;
                self.listing = listing;
            }
            FeedEvent::Disconnected(reason) => self.feed_status = ConnectionStatus::Error(reason),
        }
    }

    /// Time left in the current epoch, extrapolated from the last poll.
    pub fn countdown_ms(&self) -> u64 {
        let elapsed = self.rotation_fetched_at.elapsed().as_millis() as u64;
        self.rotation.millis_until_next_epoch.saturating_sub(elapsed)
    }
}

// ---------------------------------------------------------------------------
// Listing feed
// ---------------------------------------------------------------------------

/// Keeps a /ws connection open, forwarding every listing frame. Returns when
/// the receiving side is gone.
pub async fn run_feed(url: String, tx: mpsc::Sender<FeedEvent>) {
    let mut backoff_idx = 0usize;

    loop {
        let reason = match connect_once(&url, &tx).await {
            Ok(()) => {
                backoff_idx = 0;
                "feed closed".to_string()
            }
            Err(e) => e.to_string(),
        };
        if tx.send(FeedEvent::Disconnected(reason)).await.is_err() {
            return;
        }

        let delay_ms = FEED_BACKOFF_MS
            .get(backoff_idx)
            .or(FEED_BACKOFF_MS.last())
            .copied()
            .unwrap_or(1_000);
        backoff_idx = (backoff_idx + 1).min(FEED_BACKOFF_MS.len() - 1);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

async fn connect_once(
    url: &str,
    tx: &mpsc::Sender<FeedEvent>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (ws_stream, _) = connect_async(url).await?;
    let (_write, mut read) = ws_stream.split();
    let _ = tx.send(FeedEvent::Connected).await;

    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                if let Some(listing) = parse_listing(&text) {
                    if tx.send(FeedEvent::Listing(listing)).await.is_err() {
                        return Ok(());
                    }
                }
            }
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    }
    Ok(())
}

pub fn parse_listing(text: &str) -> Option<ListingView> {
    serde_json::from_str(text).ok()
}

/// `http://host:port` → `ws://host:port/ws`
pub fn feed_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{base}")
    };
    format!("{ws_base}/ws")
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `mm:ss`, rounded up so a running countdown never shows 00:00 early.
pub fn format_countdown(ms: u64) -> String {
    let secs = ms.div_ceil(1_000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Wall-clock `HH:MM:SS` (UTC) of an epoch-millisecond timestamp.
pub fn format_clock_ms(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| "--:--:--".to_string(), |t| t.format("%H:%M:%S").to_string())
}

pub fn format_score(score: Option<f64>) -> String {
    score.map_or("—".to_string(), |s| format!("{s:.1}"))
}

/// Date part of an RFC 3339 timestamp.
pub fn format_date(ts: &str) -> &str {
    ts.split('T').next().unwrap_or(ts)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
