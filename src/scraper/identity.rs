//! Browser-like request identity, re-rolled on every attempt.

use rand::seq::IndexedRandom;
use std::collections::BTreeMap;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2.1 Safari/605.1.15",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "ko-KR,ko;q=0.9,en;q=0.8",
    "ko-KR,ko;q=0.8,en-US;q=0.5,en;q=0.3",
    "ko,en-US;q=0.7,en;q=0.3",
];

const STATIC_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Referer", "https://search.shopping.naver.com/"),
    ("Origin", "https://search.shopping.naver.com"),
    ("DNT", "1"),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "same-origin"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
];

pub type Headers = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, Default)]
pub struct IdentityGenerator;

impl IdentityGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn random_user_agent(&self) -> &'static str {
        USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }

    pub fn random_accept_language(&self) -> &'static str {
        ACCEPT_LANGUAGES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(ACCEPT_LANGUAGES[0])
    }

    pub fn generate_headers(&self) -> Headers {
        let mut headers: Headers = STATIC_HEADERS
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        headers.insert("User-Agent", self.random_user_agent().to_string());
        headers.insert("Accept-Language", self.random_accept_language().to_string());
        headers
    }

    /// Fresh headers, with a caller-pinned user agent taking precedence.
    pub fn generate_headers_with(&self, user_agent: Option<&str>) -> Headers {
        let mut headers = self.generate_headers();
        if let Some(ua) = user_agent {
            headers.insert("User-Agent", ua.to_string());
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_come_from_pools() {
        let identity = IdentityGenerator::new();
        for _ in 0..20 {
            let h = identity.generate_headers();
            assert!(USER_AGENTS.contains(&h["User-Agent"].as_str()));
            assert!(ACCEPT_LANGUAGES.contains(&h["Accept-Language"].as_str()));
            assert_eq!(h["Origin"], "https://search.shopping.naver.com");
            assert_eq!(h["Sec-Fetch-Mode"], "cors");
            assert_eq!(h.len(), STATIC_HEADERS.len() + 2);
        }
    }

    #[test]
    fn test_user_agent_override() {
        let identity = IdentityGenerator::new();
        let h = identity.generate_headers_with(Some("custom-agent/1.0"));
        assert_eq!(h["User-Agent"], "custom-agent/1.0");
        assert!(ACCEPT_LANGUAGES.contains(&h["Accept-Language"].as_str()));

        let h = identity.generate_headers_with(None);
        assert!(USER_AGENTS.contains(&h["User-Agent"].as_str()));
    }
}
