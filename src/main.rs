mod api;
mod config;
mod db;
mod error;
mod listing;
mod pool_refresh;
mod ranking;
mod rotation;
mod schedule;
mod state;
mod supplier;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::PublishLatency;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::EntryArchive;
use crate::error::Result;
use crate::listing::{ListingDriver, ListingPublisher};
use crate::pool_refresh::PoolRefresher;
use crate::rotation::RotationClock;
use crate::state::ListingStore;
use crate::supplier::HttpSupplier;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    let archive = EntryArchive::new(pool);
    info!("Archive ready at {} ({} entries)", cfg.db_path, archive.count().await?);

    // --- Shared state ---
    let store = ListingStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(PublishLatency::new());
    let clock = RotationClock::default();
    let publisher = ListingPublisher::new(clock, Arc::clone(&latency), Arc::clone(&health));

    // --- Supplier bootstrap ---
    let supplier = Arc::new(HttpSupplier::new(&cfg.supplier_url)?);
    let refresher = PoolRefresher::new(
        supplier,
        cfg.supplier_page_size,
        Arc::clone(&store),
        archive.clone(),
        Arc::clone(&health),
    );
    match refresher.refresh().await {
        Ok(diff) => info!("Bootstrap complete: {} entries from {}", diff.added, cfg.supplier_url),
        Err(e) => warn!("Bootstrap fetch failed, starting with empty pools: {e}"),
    }

    // --- Spawn tasks ---

    // Listing driver: publishes on pool changes and at every epoch boundary
    let driver = ListingDriver::new(publisher.clone(), store.subscribe());
    tokio::spawn(async move { driver.run().await });

    // Pool refresher (background, every POOL_REFRESH_INTERVAL_SECS)
    tokio::spawn(async move { refresher.run().await });

    // HTTP API server
    let api_state = ApiState {
        publisher,
        store,
        archive,
        health,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
