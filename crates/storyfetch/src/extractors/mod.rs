//! Site extractors
//!
//! An extractor knows one family of sites: how to find a story's metadata
//! and chapter list, how to pull a single chapter, and how to enumerate the
//! stories behind a channel URL (an author page or a collection). The
//! lifecycle is `initialize` -> `scan_story` -> `extract_chapter`, with
//! `shutdown` releasing any fetcher resources at the end.
//!
//! Failures are logged and reported as `false`/`None`; nothing here returns
//! an error to the caller.

mod ffnet;
pub mod layout;

pub use ffnet::{FfnetExtractor, FfnetExtractorBuilder, FFNET_HOSTNAMES};

use crate::site::hostname;
use crate::types::{Chapter, Story};
use async_trait::async_trait;

/// Story extractor for one site family
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Hostnames this extractor handles, without `www.`/`m.` prefixes
    fn supported_hostnames(&self) -> Vec<String>;

    /// Whether `url` belongs to one of the supported hostnames
    fn supports(&self, url: &str) -> bool {
        match hostname(url) {
            Some(host) => self.supported_hostnames().iter().any(|h| *h == host),
            None => false,
        }
    }

    /// Start over with the story at `url`
    fn initialize(&mut self, url: &str);

    /// The current story, once initialized
    fn story(&self) -> Option<&Story>;

    fn story_mut(&mut self) -> Option<&mut Story>;

    /// Chapter URLs located by the last successful scan, in reading order
    fn chapter_urls(&self) -> &[String];

    /// Fetch the story page, fill in metadata and locate every chapter
    async fn scan_story(&mut self) -> bool;

    /// Fetch chapter `index` (1-based)
    async fn extract_chapter(&self, index: usize) -> Option<Chapter>;

    /// Story URLs listed behind an author or collection URL
    async fn scan_channel(&self, url: &str) -> Option<Vec<String>>;

    /// Release fetcher resources
    async fn shutdown(&self) {}
}
