//! Client for a FlareSolverr-compatible challenge solving service
//!
//! The service runs a real browser that gets past Cloudflare challenges and
//! hands back the resulting page. Starting a browser is slow, so the client
//! keeps one remote session alive and sends every request through it. The
//! service can drop sessions on its side; when an error message mentions the
//! session, the client throws the cached id away and creates a new one
//! before the next attempt.
//!
//! Wire contract (all commands are `POST {base}/v1` with a JSON body):
//!
//! - `{"cmd": "sessions.create"}` → `{"status", "session", "message"}`
//! - `{"cmd": "sessions.destroy", "session"}` → ignored
//! - `{"cmd": "request.get", "url", "maxTimeout", "session"?}` →
//!   `{"status", "solution": {"response"}, "message"}`
//!
//! `GET {base}/` answers 200 when the service is up.

use crate::error::FetchError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Port FlareSolverr listens on out of the box
pub const DEFAULT_SOLVER_PORT: u16 = 8191;

/// How to start the service, shown when it isn't answering
pub const SOLVER_START_HINT: &str =
    "docker run -d -p 8191:8191 ghcr.io/flaresolverr/flaresolverr:latest";

/// Liveness probe timeout
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Session creation timeout (the service starts a browser)
const SESSION_CREATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Session destruction timeout
const SESSION_DESTROY_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning for [`SolverClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Service root, e.g. `http://localhost:8191`
    pub base_url: String,
    /// Challenge-solving budget passed to the service as `maxTimeout`
    pub max_timeout: Duration,
    /// Attempts per URL
    pub max_retries: u32,
    /// Fixed pause after a failed request
    pub retry_delay: Duration,
    /// Added to `max_timeout` for the HTTP timeout, so the transport outlives the service's own deadline
    pub transport_margin: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::for_port(DEFAULT_SOLVER_PORT)
    }
}

impl SolverConfig {
    /// Configuration for a service on `localhost:{port}`
    pub fn for_port(port: u16) -> Self {
        Self {
            base_url: format!("http://localhost:{}", port),
            max_timeout: Duration::from_millis(60_000),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            transport_margin: Duration::from_secs(30),
        }
    }

    /// Point at a service somewhere other than localhost
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn transport_margin(mut self, transport_margin: Duration) -> Self {
        self.transport_margin = transport_margin;
        self
    }

    fn root_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }

    fn api_url(&self) -> String {
        format!("{}/v1", self.base_url.trim_end_matches('/'))
    }

    /// HTTP timeout for a `request.get` command
    fn transport_timeout(&self) -> Duration {
        self.max_timeout + self.transport_margin
    }
}

/// Command sent to the service
#[derive(Debug, Serialize)]
#[serde(tag = "cmd")]
enum SolverCommand<'a> {
    #[serde(rename = "sessions.create")]
    CreateSession,
    #[serde(rename = "sessions.destroy")]
    DestroySession { session: &'a str },
    #[serde(rename = "request.get")]
    Get {
        url: &'a str,
        #[serde(rename = "maxTimeout")]
        max_timeout: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<&'a str>,
    },
}

/// Reply from the service
#[derive(Debug, Default, Deserialize)]
pub struct SolverResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub solution: Option<SolverSolution>,
}

/// Page the service retrieved
#[derive(Debug, Default, Deserialize)]
pub struct SolverSolution {
    #[serde(default)]
    pub response: Option<String>,
}

impl SolverResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("Unknown error")
    }

    /// Whether the failure points at a stale or unknown session
    ///
    /// The service has no structured error kind, so this is a case-insensitive
    /// search for "session" in the message. Its message format is not a
    /// versioned contract; keep the heuristic confined to this method.
    pub fn is_session_error(&self) -> bool {
        !self.is_ok() && self.message().to_lowercase().contains("session")
    }

    fn into_html(self) -> Option<String> {
        self.solution.and_then(|solution| solution.response)
    }
}

/// Client for the challenge solving service
///
/// Owns the cached session id. All session changes happen while holding the
/// cache lock, so concurrent callers share one session instead of racing to
/// create several.
pub struct SolverClient {
    config: SolverConfig,
    client: reqwest::Client,
    session: Mutex<Option<String>>,
}

impl SolverClient {
    /// Create a client; no network traffic happens until the first call
    pub fn new(config: SolverConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(FetchError::ClientBuildError)?;

        Ok(Self {
            config,
            client,
            session: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Cached session id, if any
    pub async fn session_id(&self) -> Option<String> {
        self.session.lock().await.clone()
    }

    /// Probe the service root
    ///
    /// True only for an HTTP 200; every failure reads as unavailable.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(self.config.root_url())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!(error = %e, base_url = %self.config.base_url, "Challenge solver probe failed");
                false
            }
        }
    }

    /// Return the cached session, creating one if needed
    ///
    /// `None` means the client runs session-less; requests still work, just
    /// slower.
    pub async fn ensure_session(&self) -> Option<String> {
        let mut cached = self.session.lock().await;
        if let Some(session) = cached.as_ref() {
            return Some(session.clone());
        }

        *cached = self.create_session().await;
        cached.clone()
    }

    /// Drop `stale` from the cache and create a replacement
    ///
    /// If another caller already replaced `stale`, its session is reused.
    async fn renew_session(&self, stale: Option<&str>) -> Option<String> {
        let mut cached = self.session.lock().await;
        if cached.is_some() && cached.as_deref() != stale {
            return cached.clone();
        }

        *cached = self.create_session().await;
        cached.clone()
    }

    async fn create_session(&self) -> Option<String> {
        match self
            .post(&SolverCommand::CreateSession, SESSION_CREATE_TIMEOUT)
            .await
        {
            Ok(response) if response.is_ok() => match response.session {
                Some(session) => {
                    info!(session = %session, "Challenge solver session created");
                    Some(session)
                }
                None => {
                    warn!("Challenge solver created a session without an id");
                    None
                }
            },
            Ok(response) => {
                warn!(
                    message = response.message(),
                    "Failed to create challenge solver session"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to create challenge solver session");
                None
            }
        }
    }

    /// Release the cached session
    ///
    /// Best effort: failures are ignored and the cache is always cleared.
    pub async fn destroy_session(&self) {
        let mut cached = self.session.lock().await;
        let Some(session) = cached.take() else {
            return;
        };

        match self
            .post(
                &SolverCommand::DestroySession { session: &session },
                SESSION_DESTROY_TIMEOUT,
            )
            .await
        {
            Ok(_) => info!(session = %session, "Challenge solver session destroyed"),
            Err(e) => debug!(session = %session, error = %e, "Ignoring session destroy failure"),
        }
    }

    /// Fetch `url` through the service and return the page HTML
    ///
    /// Makes up to `max_retries` attempts. Timeouts and transport failures
    /// wait `retry_delay` before the next attempt; a session-related error
    /// reply renews the session instead. Returns `None` once attempts run out.
    pub async fn solve(&self, url: &str) -> Option<String> {
        let attempts = self.config.max_retries;
        let mut session = self.ensure_session().await;

        for attempt in 1..=attempts {
            match self.request_get(url, session.as_deref()).await {
                Ok(response) if response.is_ok() => {
                    let html = response.into_html();
                    if html.is_none() {
                        warn!(url, "Challenge solver reported success without a page");
                    }
                    return html;
                }
                Ok(response) => {
                    warn!(
                        attempt,
                        attempts,
                        url,
                        message = response.message(),
                        "Challenge solver error"
                    );
                    if response.is_session_error() {
                        info!("Challenge solver session looks stale, recreating it");
                        session = self.renew_session(session.as_deref()).await;
                    }
                }
                Err(FetchError::Timeout) => {
                    warn!(attempt, attempts, url, "Challenge solver timed out");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
                Err(e) => {
                    warn!(attempt, attempts, url, error = %e, "Challenge solver request failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        error!(attempts, url, "Challenge solver failed");
        None
    }

    async fn request_get(
        &self,
        url: &str,
        session: Option<&str>,
    ) -> Result<SolverResponse, FetchError> {
        let max_timeout = u64::try_from(self.config.max_timeout.as_millis()).unwrap_or(u64::MAX);
        let command = SolverCommand::Get {
            url,
            max_timeout,
            session,
        };
        self.post(&command, self.config.transport_timeout()).await
    }

    /// Send a command and decode the reply
    ///
    /// The service reports errors as JSON with a non-2xx status, so the body
    /// is decoded first and the status only matters when it isn't JSON.
    async fn post(
        &self,
        command: &SolverCommand<'_>,
        timeout: Duration,
    ) -> Result<SolverResponse, FetchError> {
        let response = self
            .client
            .post(self.config.api_url())
            .json(command)
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        match serde_json::from_str::<SolverResponse>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(FetchError::HttpStatus(status.as_u16())),
            Err(e) => Err(FetchError::SolverRejected(format!(
                "malformed reply: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.base_url, "http://localhost:8191");
        assert_eq!(config.max_timeout, Duration::from_millis(60_000));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.transport_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_config_urls() {
        let config = SolverConfig::for_port(9000).with_base_url("http://solver:9000/");
        assert_eq!(config.root_url(), "http://solver:9000/");
        assert_eq!(config.api_url(), "http://solver:9000/v1");
    }

    #[test]
    fn test_command_serialization() {
        let json = serde_json::to_value(SolverCommand::CreateSession).unwrap();
        assert_eq!(json, serde_json::json!({"cmd": "sessions.create"}));

        let json = serde_json::to_value(SolverCommand::DestroySession { session: "abc" }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cmd": "sessions.destroy", "session": "abc"})
        );

        let json = serde_json::to_value(SolverCommand::Get {
            url: "https://example.com/",
            max_timeout: 60000,
            session: None,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cmd": "request.get", "url": "https://example.com/", "maxTimeout": 60000})
        );
    }

    #[test]
    fn test_response_session_error_detection() {
        let reply: SolverResponse = serde_json::from_str(
            r#"{"status": "error", "message": "Error: This Session does not exist."}"#,
        )
        .unwrap();
        assert!(!reply.is_ok());
        assert!(reply.is_session_error());

        let reply: SolverResponse =
            serde_json::from_str(r#"{"status": "error", "message": "Timeout after 60.0 seconds."}"#)
                .unwrap();
        assert!(!reply.is_session_error());

        let reply: SolverResponse = serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert_eq!(reply.message(), "Unknown error");
        assert!(!reply.is_session_error());
    }

    #[test]
    fn test_response_html() {
        let reply: SolverResponse = serde_json::from_str(
            r#"{"status": "ok", "message": "", "solution": {"url": "x", "status": 200, "response": "<html></html>"}}"#,
        )
        .unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.into_html().as_deref(), Some("<html></html>"));
    }
}
