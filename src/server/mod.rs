//! Inbound HTTP boundary: thin axum routes over a [`ProductSource`].

pub mod rate_limit;

use crate::config::ServerConfig;
use crate::models::ScrapeOptions;
use crate::scraper::ProductSource;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info};

use self::rate_limit::{RateLimiter, rate_limit};

const EXAMPLE_URL: &str = "https://search.shopping.naver.com/ns/v1/search/paged-composite-cards?cursor=1&pageSize=50&query=iphone";

#[derive(Clone)]
pub struct AppState {
    scraper: Arc<dyn ProductSource>,
    allowed_url_pattern: Arc<str>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    url: Option<String>,
}

fn bad_request(body: serde_json::Value) -> Response {
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Absolute http(s) URL that targets the allowed upstream endpoint.
fn is_allowed_target(raw: &str, pattern: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && raw.contains(pattern),
        Err(_) => false,
    }
}

async fn scrape_handler(State(state): State<AppState>, Query(q): Query<ScrapeQuery>) -> Response {
    let Some(url) = q.url.filter(|u| !u.trim().is_empty()) else {
        return bad_request(json!({
            "error": "URL parameter is required",
            "example": format!("/naver?url={}", EXAMPLE_URL),
        }));
    };

    if !is_allowed_target(&url, &state.allowed_url_pattern) {
        return bad_request(json!({ "error": "Invalid API URL format" }));
    }

    info!("Scraping request for: {}", url);
    let start = Instant::now();

    let options = ScrapeOptions {
        use_egress: Some(true),
        max_attempts: Some(3),
        ..ScrapeOptions::default()
    };

    match state.scraper.scrape(&url, options).await {
        Ok(data) => {
            let latency = start.elapsed().as_millis();
            info!("Scraping completed in {}ms", latency);
            Json(json!({
                "success": true,
                "data": data,
                "meta": {
                    "latency": format!("{}ms", latency),
                    "timestamp": Utc::now().to_rfc3339(),
                    "url": url,
                }
            }))
            .into_response()
        }
        Err(e) => {
            error!("Scraping error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Scraping failed",
                    "message": format!("Failed to scrape: {}", e),
                })),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let healthy = state.scraper.health_check().await;
    let (status, label) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };
    (
        status,
        Json(json!({
            "status": label,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

async fn stats_handler(State(state): State<AppState>) -> Response {
    Json(state.scraper.stats()).into_response()
}

async fn root_handler() -> Response {
    Json(json!({
        "name": "Shopping Scraper API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "scrape": "GET /naver?url=<search-api-url>",
            "health": "GET /health",
            "stats": "GET /stats",
        },
        "example": format!("/naver?url={}", EXAMPLE_URL),
    }))
    .into_response()
}

pub fn router(
    scraper: Arc<dyn ProductSource>,
    config: &ServerConfig,
    limiter: Arc<RateLimiter>,
) -> Router {
    let state = AppState {
        scraper,
        allowed_url_pattern: Arc::from(config.allowed_url_pattern.as_str()),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/naver", get(scrape_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .with_state(state)
}

/// Bind to `host:port` and serve until the process exits.
pub async fn serve(config: &ServerConfig, scraper: Arc<dyn ProductSource>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Shopping scraper API running on {}", addr);
    serve_on(listener, config, scraper).await
}

pub async fn serve_on(
    listener: TcpListener,
    config: &ServerConfig,
    scraper: Arc<dyn ProductSource>,
) -> Result<()> {
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    ));

    let janitor = Arc::clone(&limiter);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            janitor.purge_expired();
        }
    });

    let app = router(scraper, config, limiter);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("HTTP server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizedProduct, NormalizedResult, ScraperStats};
    use crate::scraper::error::ScrapeError;
    use async_trait::async_trait;

    struct CannedSource {
        fail: bool,
        healthy: bool,
    }

    #[async_trait]
    impl ProductSource for CannedSource {
        async fn scrape(
            &self,
            _url: &str,
            options: ScrapeOptions,
        ) -> Result<NormalizedResult, ScrapeError> {
            assert_eq!(options.use_egress, Some(true));
            assert_eq!(options.max_attempts, Some(3));
            if self.fail {
                return Err(ScrapeError::Exhausted {
                    attempts: 3,
                    source: Box::new(ScrapeError::Blocked { status: 429 }),
                });
            }
            Ok(NormalizedResult {
                products: vec![NormalizedProduct {
                    id: "a1".into(),
                    title: "Phone".into(),
                    price: 100_000,
                    ..NormalizedProduct::default()
                }],
                total_count: 1,
                has_more: false,
                cursor: None,
            })
        }

        async fn health_check(&self) -> bool {
            self.healthy
        }

        fn stats(&self) -> ScraperStats {
            ScraperStats { active_requests: 0, max_concurrent: 5, proxy_count: 1 }
        }
    }

    async fn spawn_server(source: CannedSource, config: ServerConfig) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            serve_on(listener, &config, Arc::new(source)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn target() -> String {
        let raw = format!("{}&query=phone", EXAMPLE_URL);
        url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
    }

    #[test]
    fn test_is_allowed_target() {
        let pattern = ServerConfig::default().allowed_url_pattern;
        assert!(is_allowed_target(EXAMPLE_URL, &pattern));
        assert!(!is_allowed_target("https://example.com/search", &pattern));
        assert!(!is_allowed_target("search.shopping.naver.com/ns/v1/search/paged-composite-cards", &pattern));
        assert!(!is_allowed_target(
            "ftp://search.shopping.naver.com/ns/v1/search/paged-composite-cards",
            &pattern
        ));
    }

    #[tokio::test]
    async fn test_scrape_route() {
        let base = spawn_server(CannedSource { fail: false, healthy: true }, ServerConfig::default()).await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{}/naver", base)).send().await.unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "URL parameter is required");

        let resp = client
            .get(format!("{}/naver?url=https%3A%2F%2Fexample.com%2F", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = client.get(format!("{}/naver?url={}", base, target())).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["products"][0]["id"], "a1");
        assert_eq!(body["data"]["totalCount"], 1);
        assert!(body["meta"]["latency"].as_str().unwrap().ends_with("ms"));
    }

    #[tokio::test]
    async fn test_scrape_failure_is_500() {
        let base = spawn_server(CannedSource { fail: true, healthy: true }, ServerConfig::default()).await;
        let resp = reqwest::get(format!("{}/naver?url={}", base, target())).await.unwrap();
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Scraping failed");
        assert_eq!(body["message"], "Failed to scrape: gave up after 3 attempt(s): HTTP 429");
    }

    #[tokio::test]
    async fn test_health_and_stats_routes() {
        let base = spawn_server(CannedSource { fail: false, healthy: false }, ServerConfig::default()).await;

        let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(resp.status(), 503);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "unhealthy");

        let body: serde_json::Value = reqwest::get(format!("{}/stats", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["maxConcurrent"], 5);
        assert_eq!(body["proxyCount"], 1);

        let body: serde_json::Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
        assert_eq!(body["endpoints"]["health"], "GET /health");
    }

    #[tokio::test]
    async fn test_inbound_rate_limit() {
        let config = ServerConfig { rate_limit_max_requests: 2, ..ServerConfig::default() };
        let base = spawn_server(CannedSource { fail: false, healthy: true }, config).await;

        for _ in 0..2 {
            let resp = reqwest::get(format!("{}/stats", base)).await.unwrap();
            assert_eq!(resp.status(), 200);
        }
        let resp = reqwest::get(format!("{}/stats", base)).await.unwrap();
        assert_eq!(resp.status(), 429);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Too Many Requests");
        assert_eq!(body["retryAfter"], 60);
    }
}
