//! Challenge-solver fetcher
//!
//! Routes requests through [`SolverClient`]. The service is probed once, on
//! first use; if it doesn't answer, a warning with the start command is
//! logged and every later request is declined right away so the chain moves
//! on to the direct fetcher.

use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::solver::{SolverClient, SolverConfig, SOLVER_START_HINT};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::warn;

/// Fetcher backed by a FlareSolverr-compatible service
pub struct SolverFetcher {
    client: SolverClient,
    available: OnceCell<bool>,
}

impl SolverFetcher {
    pub fn new(config: SolverConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: SolverClient::new(config)?,
            available: OnceCell::new(),
        })
    }

    pub fn client(&self) -> &SolverClient {
        &self.client
    }

    /// Whether the service answered the one-time probe
    pub async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                let available = self.client.is_available().await;
                if !available {
                    warn!(
                        base_url = %self.client.config().base_url,
                        hint = SOLVER_START_HINT,
                        "FlareSolverr is not responding; Cloudflare-protected sites will likely fail"
                    );
                }
                available
            })
            .await
    }
}

#[async_trait]
impl Fetcher for SolverFetcher {
    fn name(&self) -> &'static str {
        "flaresolverr"
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if !self.is_available().await {
            return Err(FetchError::SolverUnavailable);
        }

        self.client
            .solve(url)
            .await
            .ok_or(FetchError::SolverExhausted(self.client.config().max_retries))
    }

    async fn shutdown(&self) {
        self.client.destroy_session().await;
    }
}
