use std::time::Duration;

use reqwest::StatusCode;
use tracing::warn;

use crate::config::SUPPLIER_RETRY_BACKOFF_MS;
use crate::error::Result;
use crate::supplier::{Collection, PoolSupplier};
use crate::types::Page;

/// Document store REST client.
///
/// `GET {base}/{collection}?limit=N[&cursor=C]` → `{"items": [...], "next_cursor": ...}`
pub struct HttpSupplier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSupplier {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_page(
        &self,
        collection: Collection,
        cursor: Option<&str>,
        page_size: usize,
    ) -> reqwest::Result<Page> {
        let url = format!("{}/{}", self.base_url, collection.path());
        let mut req = self.client.get(&url).query(&[("limit", page_size.to_string())]);
        if let Some(c) = cursor {
            req = req.query(&[("cursor", c)]);
        }
        req.send().await?.error_for_status()?.json::<Page>().await
    }
}

/// Worth another attempt: timeouts, refused connections, 429 and 5xx.
fn is_transient(e: &reqwest::Error) -> bool {
    if e.is_timeout() || e.is_connect() {
        return true;
    }
    e.status()
        .is_some_and(|s| s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS)
}

impl PoolSupplier for HttpSupplier {
    async fn fetch_page(
        &self,
        collection: Collection,
        cursor: Option<String>,
        page_size: usize,
    ) -> Result<Page> {
        let mut attempt = 0usize;
        loop {
            match self.get_page(collection, cursor.as_deref(), page_size).await {
                Ok(page) => return Ok(page),
                Err(e) if is_transient(&e) && attempt < SUPPLIER_RETRY_BACKOFF_MS.len() => {
                    let delay_ms = SUPPLIER_RETRY_BACKOFF_MS[attempt];
                    attempt += 1;
                    warn!(%collection, attempt, delay_ms, "Supplier request failed, retrying: {e}");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};

    use crate::error::AppError;
    use crate::supplier::fetch_collection;

    #[derive(Clone, Default)]
    struct Upstream {
        hits: Arc<AtomicUsize>,
        /// Requests to fail with 503 before answering.
        flaky: Arc<AtomicUsize>,
    }

    async fn launches(
        State(up): State<Upstream>,
        Query(q): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        up.hits.fetch_add(1, Ordering::SeqCst);
        if up.flaky.load(Ordering::SeqCst) > 0 {
            up.flaky.fetch_sub(1, Ordering::SeqCst);
            return AxumStatus::SERVICE_UNAVAILABLE.into_response();
        }
        let body = match q.get("cursor").map(String::as_str) {
            None => serde_json::json!({
                "items": [
                    {"id": "p1", "listing_tier": "primary", "effective_date": "2026-10-13T10:00:00Z"},
                    {"id": "b1", "listing_tier": "boosted", "score": 4.0, "effective_date": "2026-10-13T11:00:00Z"}
                ],
                "next_cursor": "page-2"
            }),
            Some("page-2") => serde_json::json!({
                "items": [{"id": "p2", "listing_tier": "primary", "effective_date": "2026-10-14T10:00:00Z"}],
                "next_cursor": null
            }),
            Some(_) => return AxumStatus::BAD_REQUEST.into_response(),
        };
        Json(body).into_response()
    }

    async fn serve(up: Upstream) -> String {
        let app = Router::new()
            .route("/v1/launches", get(launches))
            .route("/v1/premium", get(|| async { AxumStatus::FORBIDDEN }))
            .with_state(up);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/v1/")
    }

    #[tokio::test]
    async fn follows_cursors_across_pages() {
        let up = Upstream::default();
        let supplier = HttpSupplier::new(&serve(up.clone()).await).unwrap();

        let entries = fetch_collection(&supplier, Collection::Launches, 2).await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "b1", "p2"]);
        assert_eq!(entries[1].score, Some(4.0));
        assert_eq!(up.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let up = Upstream::default();
        up.flaky.store(2, Ordering::SeqCst);
        let supplier = HttpSupplier::new(&serve(up.clone()).await).unwrap();

        let page = supplier.fetch_page(Collection::Launches, None, 10).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(up.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let supplier = HttpSupplier::new(&serve(Upstream::default()).await).unwrap();

        let err = supplier.fetch_page(Collection::Premium, None, 10).await.unwrap_err();
        match err {
            AppError::Http(e) => assert_eq!(e.status(), Some(StatusCode::FORBIDDEN)),
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }
}
