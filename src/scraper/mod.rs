pub mod delay;
pub mod egress;
pub mod error;
pub mod gate;
pub mod http_client;
pub mod identity;
pub mod normalizer;
pub mod retry;

use crate::config::ScrapingConfig;
use crate::models::{
    EgressEndpoint, NormalizedResult, ScrapeOptions, ScrapeRequest, ScraperStats,
};
use crate::utils::truncate_url;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use self::delay::{DelayScheduler, RandomDelay};
use self::egress::EgressRouter;
use self::error::ScrapeError;
use self::gate::ConcurrencyGate;
use self::http_client::{Fetcher, HttpFetcher};
use self::retry::{DelayWindows, RetryController};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Inbound boundary used by the HTTP server and the CLI.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn scrape(&self, url: &str, options: ScrapeOptions)
    -> Result<NormalizedResult, ScrapeError>;
    async fn health_check(&self) -> bool;
    fn stats(&self) -> ScraperStats;
}

// ── Scraper ───────────────────────────────────────────────────────────────────

pub struct ShoppingScraper {
    gate: ConcurrencyGate,
    egress: Arc<EgressRouter>,
    retry: RetryController,
    config: ScrapingConfig,
}

impl ShoppingScraper {
    pub fn new(config: &ScrapingConfig, endpoints: Vec<EgressEndpoint>) -> Self {
        Self::with_parts(config, endpoints, Arc::new(HttpFetcher), Arc::new(RandomDelay))
    }

    /// Wire in a custom fetcher / delay scheduler.
    pub fn with_parts(
        config: &ScrapingConfig,
        endpoints: Vec<EgressEndpoint>,
        fetcher: Arc<dyn Fetcher>,
        delay: Arc<dyn DelayScheduler>,
    ) -> Self {
        let egress = Arc::new(EgressRouter::new(endpoints));
        let retry = RetryController::new(
            fetcher,
            delay,
            Arc::clone(&egress),
            DelayWindows::from(config),
        );
        Self {
            gate: ConcurrencyGate::new(config.max_concurrent_requests),
            egress,
            retry,
            config: config.clone(),
        }
    }

    fn resolve(&self, url: &str, options: ScrapeOptions) -> ScrapeRequest {
        ScrapeRequest {
            url: url.to_string(),
            use_egress: options.use_egress.unwrap_or(true),
            max_attempts: options.max_attempts.unwrap_or(self.config.max_attempts).max(1),
            timeout: options.timeout.unwrap_or_else(|| self.config.timeout()),
            user_agent: options.user_agent,
        }
    }
}

#[async_trait]
impl ProductSource for ShoppingScraper {
    async fn scrape(
        &self,
        url: &str,
        options: ScrapeOptions,
    ) -> Result<NormalizedResult, ScrapeError> {
        let request = self.resolve(url, options);

        let response = {
            let _ticket = self.gate.admit().await;
            self.retry.execute(&request).await
        };

        match response {
            Ok(resp) => {
                let result = normalizer::normalize(&resp.body);
                info!(
                    "Scraped {} products from {}",
                    result.products.len(),
                    truncate_url(&request.url, 100)
                );
                Ok(result)
            }
            Err(e) => {
                error!("Scraping failed: {}", e);
                Err(e)
            }
        }
    }

    /// One direct attempt against the configured probe URL; 200 = healthy.
    async fn health_check(&self) -> bool {
        let options = ScrapeOptions {
            use_egress: Some(false),
            max_attempts: Some(1),
            ..ScrapeOptions::default()
        };
        let request = self.resolve(&self.config.health_check_url, options);
        match self.retry.execute(&request).await {
            Ok(resp) => resp.status == 200,
            Err(e) => {
                info!("Health check failed: {}", e);
                false
            }
        }
    }

    fn stats(&self) -> ScraperStats {
        ScraperStats {
            active_requests: self.gate.in_flight(),
            max_concurrent: self.gate.capacity(),
            proxy_count: self.egress.count(),
        }
    }
}
