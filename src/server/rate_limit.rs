//! Fixed-window request limiter keyed by client IP.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    store: DashMap<IpAddr, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            store: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// `Err(retry_after_secs)` when `client` has used up its window.
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), u64> {
        let mut entry = self.store.entry(client).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if entry.reset_at <= now {
            *entry = Window {
                count: 0,
                reset_at: now + self.window,
            };
        }

        if entry.count >= self.max_requests {
            let remaining = entry.reset_at.saturating_duration_since(now);
            return Err(remaining.as_millis().div_ceil(1000) as u64);
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop windows that have already reset.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.store.retain(|_, w| w.reset_at > now);
    }

    #[cfg(test)]
    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check(addr.ip()) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!("Rate limit hit for {}", addr.ip());
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too Many Requests",
                    "retryAfter": retry_after,
                })),
            )
                .into_response()
        }
    }
}
