use crate::models::EgressEndpoint;
use crate::scraper::error::ScrapeError;
use crate::scraper::identity::Headers;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::warn;

/// Raw upstream reply. Status is never interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Single GET. Any completed exchange is `Ok`, whatever the status code;
/// only transport failures are `Err`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        headers: &Headers,
        egress: Option<&EgressEndpoint>,
        timeout: Duration,
    ) -> Result<FetchResponse, ScrapeError>;
}

/// reqwest-backed fetcher. Builds a fresh client per call so no connection
/// or header state leaks between attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    fn build_client(
        headers: &Headers,
        egress: Option<&EgressEndpoint>,
        timeout: Duration,
    ) -> Result<reqwest::Client, ScrapeError> {
        let mut header_map = HeaderMap::new();
        for (k, v) in headers {
            match (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
                (Ok(k), Ok(v)) => {
                    header_map.insert(k, v);
                }
                _ => warn!("Dropping invalid header {}", k),
            }
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(header_map)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true);

        builder = match egress {
            Some(endpoint) => {
                let mut proxy = reqwest::Proxy::all(endpoint.proxy_url())
                    .map_err(|e| ScrapeError::Transport(format!("invalid proxy: {}", e)))?;
                if let Some(creds) = &endpoint.credentials {
                    proxy = proxy.basic_auth(&creds.username, &creds.password);
                }
                builder.proxy(proxy)
            }
            // Ignore HTTP(S)_PROXY from the environment
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| ScrapeError::Transport(format!("failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &Headers,
        egress: Option<&EgressEndpoint>,
        timeout: Duration,
    ) -> Result<FetchResponse, ScrapeError> {
        let client = Self::build_client(headers, egress, timeout)?;
        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::identity::IdentityGenerator;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_non_2xx_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let headers = IdentityGenerator::new().generate_headers();
        let resp = HttpFetcher
            .fetch(&format!("{}/blocked", server.uri()), &headers, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(resp.status, 429);
        assert_eq!(resp.body, "slow down");

        let resp = HttpFetcher
            .fetch(&format!("{}/broken", server.uri()), &headers, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(resp.status, 500);
    }

    #[tokio::test]
    async fn test_identity_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("user-agent", "pinned/1.0"))
            .and(header_exists("accept-language"))
            .and(header("sec-fetch-site", "same-origin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let headers = IdentityGenerator::new().generate_headers_with(Some("pinned/1.0"));
        let resp = HttpFetcher
            .fetch(&format!("{}/search", server.uri()), &headers, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "{}");
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = HttpFetcher
            .fetch(&server.uri(), &Headers::new(), None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Transport(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let err = HttpFetcher
            .fetch("http://127.0.0.1:1/", &Headers::new(), None, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_transport_error() {
        let egress = EgressEndpoint::new("127.0.0.1", 1, "user", "secret");
        let err = HttpFetcher
            .fetch(
                "http://example.invalid/",
                &Headers::new(),
                Some(&egress),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Transport(_)));
    }
}
