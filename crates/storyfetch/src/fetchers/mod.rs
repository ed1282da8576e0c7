//! Fetch strategies and the chain that tries them in order
//!
//! Design: every strategy has the same shape, `url -> HTML or error`.
//! FetcherChain walks its strategies in registration order and returns the
//! first page any of them produces, so a new fallback tier is one more
//! `register` call.

mod direct;
mod solver;

pub use direct::DirectFetcher;
pub use solver::SolverFetcher;

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::solver::SOLVER_START_HINT;
use async_trait::async_trait;
use scraper::Html;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// One way of retrieving a page's HTML
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Retrieve the HTML at `url`
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Release any remote resources held by the fetcher
    async fn shutdown(&self) {}
}

/// A retrieved page
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
    /// Name of the fetcher that produced the page
    pub fetcher: &'static str,
}

impl Page {
    /// Parse the page
    ///
    /// `Html` isn't `Send`; parse, read what you need and drop it before the
    /// next `.await`.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

static SOLVER_NOT_CONFIGURED: OnceLock<()> = OnceLock::new();

/// Warn, once per process, that no challenge solver is configured
///
/// Returns whether this call emitted the warning.
fn warn_solver_not_configured() -> bool {
    if SOLVER_NOT_CONFIGURED.set(()).is_err() {
        return false;
    }
    warn!(
        hint = SOLVER_START_HINT,
        "FlareSolverr is not configured; Cloudflare-protected sites will likely fail"
    );
    true
}

/// Ordered list of fetch strategies
pub struct FetcherChain {
    fetchers: Vec<Box<dyn Fetcher>>,
}

impl Default for FetcherChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FetcherChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            fetchers: Vec::new(),
        }
    }

    /// Build the standard chain for `options`
    ///
    /// Includes (in order of priority):
    /// 1. SolverFetcher - only when a solver is configured
    /// 2. DirectFetcher - always
    pub fn from_options(options: &FetchOptions) -> Result<Self, FetchError> {
        let mut chain = Self::new();

        match &options.solver {
            Some(config) => chain.register(Box::new(SolverFetcher::new(config.clone())?)),
            None => {
                warn_solver_not_configured();
            }
        }

        chain.register(Box::new(DirectFetcher::new(options)?));
        Ok(chain)
    }

    /// Register a fetcher after the existing ones
    pub fn register(&mut self, fetcher: Box<dyn Fetcher>) {
        self.fetchers.push(fetcher);
    }

    /// Names of the registered fetchers, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.fetchers.iter().map(|fetcher| fetcher.name()).collect()
    }

    /// Fetch `url` with the first fetcher that succeeds
    ///
    /// Returns `None` when every fetcher failed.
    pub async fn fetch_page(&self, url: &str) -> Option<Page> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            warn!(url, "Refusing to fetch non-HTTP URL");
            return None;
        }

        for fetcher in &self.fetchers {
            debug!(fetcher = fetcher.name(), url, "Using fetcher");
            match fetcher.fetch(url).await {
                Ok(html) => {
                    return Some(Page {
                        url: url.to_string(),
                        html,
                        fetcher: fetcher.name(),
                    })
                }
                // Already reported once when the probe failed
                Err(FetchError::SolverUnavailable) => {
                    debug!(fetcher = fetcher.name(), url, "Fetcher unavailable, skipping");
                }
                Err(e) => {
                    warn!(fetcher = fetcher.name(), url, error = %e, "Fetcher failed, falling back");
                }
            }
        }

        warn!(url, "No fetcher could retrieve the page");
        None
    }

    /// Shut every fetcher down
    pub async fn shutdown(&self) {
        for fetcher in &self.fetchers {
            fetcher.shutdown().await;
        }
    }
}
