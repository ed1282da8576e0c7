//! Direct HTTP fetcher
//!
//! Plain GET with a browser-like User-Agent and a cookie store that lives as
//! long as the fetcher, so cookies set by one page ride along on the next.
//! This is the fallback tier behind the challenge solver.

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout unless overridden
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cookie-aware direct fetcher
pub struct DirectFetcher {
    client: reqwest::Client,
}

impl DirectFetcher {
    /// Create a fetcher with its own cookie store
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(options.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()
            .map_err(FetchError::ClientBuildError)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for DirectFetcher {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(FetchError::from_reqwest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_fetcher_name() {
        let fetcher = DirectFetcher::new(&FetchOptions::default()).unwrap();
        assert_eq!(fetcher.name(), "direct");
    }

    #[test]
    fn test_direct_fetcher_tolerates_bad_user_agent() {
        let options = FetchOptions::default().with_user_agent("bad\nagent");
        assert!(DirectFetcher::new(&options).is_ok());
    }
}
