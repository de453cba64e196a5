use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Egress endpoint ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One outbound proxy. Read-only after startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EgressEndpoint {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl EgressEndpoint {
    /// Empty `username` means the proxy takes no credentials.
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Self {
        let credentials = if username.is_empty() {
            None
        } else {
            Some(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
        };
        Self {
            host: host.to_string(),
            port,
            credentials,
        }
    }

    /// Proxy URL without credentials, safe for logs.
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// ── Scrape request ────────────────────────────────────────────────────────────

/// Per-call overrides supplied by the caller. `None` falls back to config.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub use_egress: Option<bool>,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

/// A logical request with every option resolved.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub use_egress: bool,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

// ── Normalized output ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub id: String,
    pub title: String,
    pub price: i64,           // smallest currency unit
    pub image_url: String,
    pub shop_name: String,
    pub rating: f64,
    pub review_count: i64,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub products: Vec<NormalizedProduct>,
    pub total_count: i64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl NormalizedResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

// ── Runtime stats ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScraperStats {
    pub active_requests: usize,
    pub max_concurrent: usize,
    pub proxy_count: usize,
}
