//! storyfetch - story extraction for Cloudflare-protected fiction sites
//!
//! This crate pulls story metadata, chapter text and author/collection
//! listings out of fanfiction.net and fictionpress.com.
//!
//! ## Fetching
//!
//! Pages come through a [`FetcherChain`] that tries, in order:
//! - [`SolverFetcher`] - a FlareSolverr-compatible challenge solver, reusing
//!   one browser session across requests
//! - [`DirectFetcher`] - a plain cookie-aware HTTP GET
//!
//! ## Extracting
//!
//! ```no_run
//! use storyfetch::{Extractor, FfnetExtractor};
//!
//! # async fn run() {
//! let mut extractor = FfnetExtractor::builder().solver_port(8191).build().unwrap();
//! extractor.initialize("https://www.fanfiction.net/s/12345/");
//! if extractor.scan_story().await {
//!     let first = extractor.extract_chapter(1).await;
//! }
//! extractor.shutdown().await;
//! # }
//! ```

pub mod client;
pub mod convert;
pub mod dates;
mod error;
pub mod extractors;
pub mod fetchers;
pub mod site;
pub mod solver;
mod types;

pub use client::{fetch_page, FetchOptions};
pub use convert::{clean_whitespace, strip_html};
pub use dates::{parse_date_string, DateFormat, DateParser};
pub use error::{ExtractError, FetchError};
pub use extractors::{Extractor, FfnetExtractor, FfnetExtractorBuilder};
pub use fetchers::{DirectFetcher, Fetcher, FetcherChain, Page, SolverFetcher};
pub use solver::{SolverClient, SolverConfig, DEFAULT_SOLVER_PORT};
pub use types::{Chapter, Story, StoryMetadata};

/// Default User-Agent string for direct fetches
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
