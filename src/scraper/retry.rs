//! Attempt loop for one logical request.
//!
//! Each attempt: jitter → fresh identity + egress → fetch → classify.
//!
//! | outcome              | remaining budget          | no budget left        |
//! |----------------------|---------------------------|-----------------------|
//! | 200 + body           | return                    | return                |
//! | 429 / 403            | rotate, block backoff     | `Exhausted(Blocked)`  |
//! | transport / empty    | rotate, transport backoff | `Exhausted(cause)`    |
//! | anything else        | `Http`, no retry          | `Http`                |

use crate::config::ScrapingConfig;
use crate::models::{EgressEndpoint, ScrapeRequest};
use crate::scraper::delay::DelayScheduler;
use crate::scraper::egress::EgressRouter;
use crate::scraper::error::ScrapeError;
use crate::scraper::http_client::{FetchResponse, Fetcher};
use crate::scraper::identity::IdentityGenerator;
use crate::utils::truncate_url;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Classification of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(FetchResponse),
    RetryableBlock(u16),
    HardError(ScrapeError),
}

impl AttemptOutcome {
    pub fn classify(result: Result<FetchResponse, ScrapeError>) -> Self {
        match result {
            Ok(resp) if resp.status == 200 && !resp.body.is_empty() => AttemptOutcome::Success(resp),
            Ok(resp) if resp.status == 200 => AttemptOutcome::HardError(ScrapeError::EmptyBody),
            Ok(resp) if resp.status == 429 || resp.status == 403 => {
                AttemptOutcome::RetryableBlock(resp.status)
            }
            Ok(resp) => AttemptOutcome::HardError(ScrapeError::Http { status: resp.status }),
            Err(e) => AttemptOutcome::HardError(e),
        }
    }
}

/// Millisecond bounds for each of the three pause kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayWindows {
    pub jitter: (u64, u64),
    pub transport_backoff: (u64, u64),
    pub block_backoff: (u64, u64),
}

impl From<&ScrapingConfig> for DelayWindows {
    fn from(cfg: &ScrapingConfig) -> Self {
        Self {
            jitter: (cfg.delay_min_ms, cfg.delay_max_ms),
            transport_backoff: (cfg.transport_backoff_min_ms, cfg.transport_backoff_max_ms),
            block_backoff: (cfg.block_backoff_min_ms, cfg.block_backoff_max_ms),
        }
    }
}

pub struct RetryController {
    fetcher: Arc<dyn Fetcher>,
    delay: Arc<dyn DelayScheduler>,
    egress: Arc<EgressRouter>,
    identity: IdentityGenerator,
    windows: DelayWindows,
}

impl RetryController {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        delay: Arc<dyn DelayScheduler>,
        egress: Arc<EgressRouter>,
        windows: DelayWindows,
    ) -> Self {
        Self {
            fetcher,
            delay,
            egress,
            identity: IdentityGenerator::new(),
            windows,
        }
    }

    fn rotate_after(&self, lease: Option<&(usize, EgressEndpoint)>) {
        if let Some((slot, _)) = lease {
            self.egress.rotate(*slot);
        }
    }

    /// Run attempts until success, a hard failure, or the budget is spent.
    pub async fn execute(&self, request: &ScrapeRequest) -> Result<FetchResponse, ScrapeError> {
        let max_attempts = request.max_attempts.max(1);
        let mut last_error: Option<ScrapeError> = None;

        for attempt in 1..=max_attempts {
            let (lo, hi) = self.windows.jitter;
            self.delay.wait(lo, hi).await;

            let headers = self.identity.generate_headers_with(request.user_agent.as_deref());
            let lease = if request.use_egress { self.egress.next() } else { None };

            info!(
                "Attempt {}/{} for URL: {}",
                attempt,
                max_attempts,
                truncate_url(&request.url, 100)
            );

            let result = self
                .fetcher
                .fetch(&request.url, &headers, lease.as_ref().map(|(_, e)| e), request.timeout)
                .await;
            let has_budget = attempt < max_attempts;

            match AttemptOutcome::classify(result) {
                AttemptOutcome::Success(resp) => {
                    info!("Attempt {}/{} succeeded", attempt, max_attempts);
                    return Ok(resp);
                }
                AttemptOutcome::RetryableBlock(status) => {
                    warn!("Rate limited or blocked ({}), rotating egress", status);
                    last_error = Some(ScrapeError::Blocked { status });
                    if has_budget {
                        self.rotate_after(lease.as_ref());
                        let (lo, hi) = self.windows.block_backoff;
                        self.delay.wait(lo, hi).await;
                    }
                }
                AttemptOutcome::HardError(e) if e.is_retryable() => {
                    error!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = Some(e);
                    if has_budget {
                        self.rotate_after(lease.as_ref());
                        let (lo, hi) = self.windows.transport_backoff;
                        self.delay.wait(lo, hi).await;
                    }
                }
                AttemptOutcome::HardError(e) => {
                    error!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                    return Err(e);
                }
            }
        }

        // Loop ran at least once and every non-returning arm records an error
        let source = last_error.unwrap_or(ScrapeError::Transport("no attempt made".into()));
        Err(ScrapeError::Exhausted {
            attempts: max_attempts,
            source: Box::new(source),
        })
    }
}
