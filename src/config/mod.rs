use crate::models::EgressEndpoint;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Outbound proxy configuration. An empty `host` means no primary endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EgressConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_egress_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Extra endpoints rotated after the primary one.
    #[serde(default)]
    pub endpoints: Vec<EgressEndpoint>,
}

/// Resilient-fetch tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapingConfig {
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_transport_backoff_min_ms")]
    pub transport_backoff_min_ms: u64,

    #[serde(default = "default_transport_backoff_max_ms")]
    pub transport_backoff_max_ms: u64,

    #[serde(default = "default_block_backoff_min_ms")]
    pub block_backoff_min_ms: u64,

    #[serde(default = "default_block_backoff_max_ms")]
    pub block_backoff_max_ms: u64,

    #[serde(default = "default_health_check_url")]
    pub health_check_url: String,
}

/// Inbound HTTP boundary
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_allowed_url_pattern")]
    pub allowed_url_pattern: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_egress_port() -> u16 {
    9999
}
fn default_max_concurrent_requests() -> usize {
    5
}
fn default_delay_min_ms() -> u64 {
    1000
}
fn default_delay_max_ms() -> u64 {
    3000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_transport_backoff_min_ms() -> u64 {
    2000
}
fn default_transport_backoff_max_ms() -> u64 {
    5000
}
fn default_block_backoff_min_ms() -> u64 {
    5000
}
fn default_block_backoff_max_ms() -> u64 {
    10_000
}
fn default_health_check_url() -> String {
    "https://search.shopping.naver.com/ns/v1/search/paged-composite-cards?cursor=1&pageSize=10&query=iphone"
        .to_string()
}
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    3000
}
fn default_rate_limit_max_requests() -> u32 {
    100
}
fn default_rate_limit_window_secs() -> u64 {
    60
}
fn default_allowed_url_pattern() -> String {
    "search.shopping.naver.com/ns/v1/search/paged-composite-cards".to_string()
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_egress_port(),
            username: String::new(),
            password: String::new(),
            endpoints: Vec::new(),
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            max_attempts: default_max_attempts(),
            timeout_ms: default_timeout_ms(),
            transport_backoff_min_ms: default_transport_backoff_min_ms(),
            transport_backoff_max_ms: default_transport_backoff_max_ms(),
            block_backoff_min_ms: default_block_backoff_min_ms(),
            block_backoff_max_ms: default_block_backoff_max_ms(),
            health_check_url: default_health_check_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            allowed_url_pattern: default_allowed_url_pattern(),
        }
    }
}

impl EgressConfig {
    /// Effective rotation list: primary endpoint (if any) then the extras.
    pub fn endpoints(&self) -> Vec<EgressEndpoint> {
        let mut list = Vec::with_capacity(self.endpoints.len() + 1);

        if !self.host.trim().is_empty() {
            list.push(EgressEndpoint::new(
                self.host.trim(),
                self.port,
                &self.username,
                &self.password,
            ));
        }

        list.extend(
            self.endpoints
                .iter()
                .filter(|e| !e.host.trim().is_empty())
                .cloned(),
        );
        list
    }
}

impl ScrapingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SCRAPER").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration ({}), using defaults", e);
            AppConfig::default()
        });
        Ok(app_cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scraping.max_concurrent_requests, 5);
        assert_eq!(cfg.scraping.delay_min_ms, 1000);
        assert_eq!(cfg.scraping.delay_max_ms, 3000);
        assert_eq!(cfg.scraping.max_attempts, 3);
        assert_eq!(cfg.scraping.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.egress.port, 9999);
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn test_empty_host_means_direct_connection() {
        let cfg = EgressConfig::default();
        assert!(cfg.endpoints().is_empty());

        let cfg = EgressConfig {
            host: "   ".into(),
            ..EgressConfig::default()
        };
        assert!(cfg.endpoints().is_empty());
    }

    #[test]
    fn test_primary_endpoint_comes_first() {
        let cfg = EgressConfig {
            host: "proxy.local".into(),
            port: 8080,
            username: "user".into(),
            password: "pw".into(),
            endpoints: vec![
                EgressEndpoint::new("backup.local", 3128, "", ""),
                EgressEndpoint::new("", 1, "", ""),
            ],
        };

        let list = cfg.endpoints();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].host, "proxy.local");
        assert!(list[0].credentials.is_some());
        assert_eq!(list[1].host, "backup.local");
        assert!(list[1].credentials.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"scraping": {"max_attempts": 7}}"#).unwrap();
        assert_eq!(cfg.scraping.max_attempts, 7);
        assert_eq!(cfg.scraping.delay_max_ms, 3000);
        assert_eq!(cfg.server.rate_limit_max_requests, 100);
    }
}
