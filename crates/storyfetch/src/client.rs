//! Fetch options and one-shot entry point
//!
//! Most callers go through an [`Extractor`](crate::Extractor), which owns a
//! [`FetcherChain`] for its whole run. [`fetch_page`] builds a throwaway chain
//! for a single URL.

use crate::error::FetchError;
use crate::fetchers::{FetcherChain, Page};
use crate::solver::SolverConfig;
use std::time::Duration;

/// Options shared by every fetch strategy
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Custom User-Agent for direct fetches
    pub user_agent: Option<String>,
    /// Timeout for direct fetches
    pub request_timeout: Option<Duration>,
    /// Challenge solver to route requests through; `None` disables it
    pub solver: Option<SolverConfig>,
}

impl FetchOptions {
    /// Route requests through a solver on `localhost:{port}`
    pub fn with_solver_port(mut self, port: u16) -> Self {
        self.solver = Some(SolverConfig::for_port(port));
        self
    }

    pub fn with_solver(mut self, config: SolverConfig) -> Self {
        self.solver = Some(config);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Fetch one page with a freshly built fetcher chain
///
/// The solver session, if one was created, is released before returning.
pub async fn fetch_page(url: &str, options: &FetchOptions) -> Result<Page, FetchError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(FetchError::InvalidUrlScheme);
    }

    let chain = FetcherChain::from_options(options)?;
    let page = chain.fetch_page(url).await;
    chain.shutdown().await;

    page.ok_or_else(|| FetchError::NoPage(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_page_invalid_scheme() {
        let result = fetch_page("ftp://example.com", &FetchOptions::default()).await;
        assert!(matches!(result, Err(FetchError::InvalidUrlScheme)));
    }

    #[test]
    fn test_fetch_options_default() {
        let options = FetchOptions::default();
        assert!(options.user_agent.is_none());
        assert!(options.request_timeout.is_none());
        assert!(options.solver.is_none());
    }

    #[test]
    fn test_fetch_options_solver_port() {
        let options = FetchOptions::default()
            .with_solver_port(8192)
            .with_user_agent("TestAgent/1.0");
        assert_eq!(
            options.solver.map(|config| config.base_url),
            Some("http://localhost:8192".to_string())
        );
        assert_eq!(options.user_agent.as_deref(), Some("TestAgent/1.0"));
    }
}
