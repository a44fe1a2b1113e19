use crate::error::{AppError, Result};

pub const SUPPLIER_URL: &str = "http://localhost:8080/v1";

/// Width of one rotation epoch (10 minutes).
pub const ROTATION_INTERVAL_MS: u64 = 600_000;

/// Minimum number of primary entries between two boosted insertions.
pub const MIN_BOOSTED_SPACING: usize = 2;

/// How many winners the ranked window exposes.
pub const RANKED_WINDOW_SIZE: usize = 3;

/// Length of one ranking period in days. Periods start Monday 00:00 UTC.
pub const RANKED_PERIOD_DAYS: i64 = 7;

/// Pool refresh interval (seconds): how often to re-fetch pools from the supplier.
pub const POOL_REFRESH_INTERVAL_SECS: u64 = 60;

/// Supplier retry backoff values in milliseconds. One retry per value.
pub const SUPPLIER_RETRY_BACKOFF_MS: &[u64] = &[100, 200, 400, 800];

/// Hard stop for cursor pagination so a misbehaving supplier can't loop us forever.
pub const MAX_SUPPLIER_PAGES: usize = 200;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub supplier_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Page size requested from the supplier (SUPPLIER_PAGE_SIZE)
    pub supplier_page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            supplier_url: std::env::var("SUPPLIER_URL")
                .unwrap_or_else(|_| SUPPLIER_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "listing.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            supplier_page_size: std::env::var("SUPPLIER_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}
