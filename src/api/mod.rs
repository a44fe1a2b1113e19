pub mod feed;
pub mod health;
pub mod latency;
pub mod routes;
