//! Error types for storyfetch

use thiserror::Error;

/// Errors that can occur while fetching a page through one fetch strategy
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Challenge solver is configured but not answering
    #[error("Challenge solver is not available")]
    SolverUnavailable,

    /// Challenge solver gave up on the URL
    #[error("Challenge solver failed after {0} attempt(s)")]
    SolverExhausted(u32),

    /// Challenge solver rejected a command
    #[error("Challenge solver error: {0}")]
    SolverRejected(String),

    /// Every fetch strategy failed
    #[error("No fetch strategy could retrieve {0}")]
    NoPage(String),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::RequestError(err.to_string())
        }
    }
}

/// Errors raised while pulling story data out of a fetched page
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Extractor used before a story URL was set
    #[error("The extractor isn't initialized")]
    NotInitialized,

    /// A structural element the layout depends on is missing
    #[error("Element not found: {0}")]
    MissingElement(&'static str),

    /// A required header field is missing
    #[error("Field not found in header: {0}")]
    MissingField(&'static str),

    /// No story ID in the URL
    #[error("Failed to retrieve story ID from URL: {0}")]
    MissingStoryId(String),

    /// URL is neither an author page nor a collection
    #[error("Unsupported channel URL: {0}")]
    UnsupportedUrl(String),

    /// Page could not be fetched by any strategy
    #[error("Failed to download page: {0}")]
    PageUnavailable(String),

    /// Chapter index outside the scanned chapter list
    #[error("Chapter {index} requested but only {available} chapter(s) located")]
    ChapterOutOfRange { index: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(FetchError::HttpStatus(503).to_string(), "Unexpected HTTP status: 503");
        assert_eq!(
            FetchError::SolverExhausted(3).to_string(),
            "Challenge solver failed after 3 attempt(s)"
        );
        assert_eq!(
            ExtractError::MissingField("Words").to_string(),
            "Field not found in header: Words"
        );
        assert_eq!(
            ExtractError::ChapterOutOfRange {
                index: 4,
                available: 3
            }
            .to_string(),
            "Chapter 4 requested but only 3 chapter(s) located"
        );
    }
}
