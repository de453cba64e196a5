use thiserror::Error;

/// Failure taxonomy for one logical request.
///
/// `Transport`, `EmptyBody` and `Blocked` are absorbed by the retry loop;
/// callers only ever see `Http` or `Exhausted`.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// DNS, connect, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// 200 with nothing in it.
    #[error("HTTP 200 with empty body")]
    EmptyBody,

    /// 429 / 403 from upstream.
    #[error("HTTP {status}")]
    Blocked { status: u16 },

    /// Any other non-success status. Never retried.
    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<ScrapeError>,
    },
}

impl ScrapeError {
    /// Failures that warrant another attempt through a different egress.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Transport(_) | ScrapeError::EmptyBody | ScrapeError::Blocked { .. }
        )
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Transport(format!("timed out: {}", e))
        } else {
            ScrapeError::Transport(e.to_string())
        }
    }
}
