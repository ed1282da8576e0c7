//! Extractor for fanfiction.net and fictionpress.com
//!
//! Both sites sit behind Cloudflare, so pages normally come through the
//! challenge solver with the direct fetcher as a fallback. See
//! [`layout`](super::layout) for the page parsing itself.

use super::layout::{
    chapter_urls, collection_entry_selector, collection_name_and_id, collection_page_url,
    last_page_index, listing_story_ids, parse_author_listing, parse_chapter,
    parse_story_header, story_id, story_url, user_id,
};
use super::Extractor;
use crate::client::FetchOptions;
use crate::error::{ExtractError, FetchError};
use crate::fetchers::{FetcherChain, Page};
use crate::site::site_url;
use crate::solver::SolverConfig;
use crate::types::{Chapter, Story};
use async_trait::async_trait;
use chrono::Local;
use std::time::Duration;
use tracing::{error, info};

/// Hostnames served by this extractor
pub const FFNET_HOSTNAMES: &[&str] = &["fanfiction.net", "fictionpress.com"];

/// Builder for [`FfnetExtractor`]
#[derive(Debug, Clone, Default)]
pub struct FfnetExtractorBuilder {
    options: FetchOptions,
    extra_hostnames: Vec<String>,
}

impl FfnetExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route requests through a challenge solver on `localhost:{port}`
    pub fn solver_port(mut self, port: u16) -> Self {
        self.options.solver = Some(SolverConfig::for_port(port));
        self
    }

    /// Route requests through a challenge solver with custom tuning
    pub fn solver(mut self, config: SolverConfig) -> Self {
        self.options.solver = Some(config);
        self
    }

    /// Set custom User-Agent for direct fetches
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    /// Set timeout for direct fetches
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    /// Accept an additional hostname (a mirror serving the same layout)
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.extra_hostnames.push(hostname.into().to_lowercase());
        self
    }

    /// Build the extractor
    pub fn build(self) -> Result<FfnetExtractor, FetchError> {
        let chain = FetcherChain::from_options(&self.options)?;
        let mut extractor = FfnetExtractor::with_chain(chain);
        extractor.extra_hostnames = self.extra_hostnames;
        Ok(extractor)
    }
}

/// fanfiction.net / fictionpress.com extractor
pub struct FfnetExtractor {
    chain: FetcherChain,
    extra_hostnames: Vec<String>,
    story: Option<Story>,
    chapter_urls: Vec<String>,
}

impl FfnetExtractor {
    /// Create a new extractor builder
    pub fn builder() -> FfnetExtractorBuilder {
        FfnetExtractorBuilder::new()
    }

    /// Extractor that fetches through a custom chain
    pub fn with_chain(chain: FetcherChain) -> Self {
        Self {
            chain,
            extra_hostnames: Vec::new(),
            story: None,
            chapter_urls: Vec::new(),
        }
    }

    pub fn chain(&self) -> &FetcherChain {
        &self.chain
    }

    async fn fetch(&self, url: &str) -> Result<Page, ExtractError> {
        self.chain
            .fetch_page(url)
            .await
            .ok_or_else(|| ExtractError::PageUnavailable(url.to_string()))
    }

    async fn try_scan_story(&mut self) -> Result<(), ExtractError> {
        let requested = self
            .story
            .as_ref()
            .map(|story| story.url.clone())
            .ok_or(ExtractError::NotInitialized)?;

        let missing_id = || ExtractError::MissingStoryId(requested.clone());
        let id = story_id(&requested).ok_or_else(missing_id)?;
        let site = site_url(&requested).ok_or_else(missing_id)?;
        let normalized = story_url(&site, &id);

        let page = self.fetch(&normalized).await?;
        let metadata = parse_story_header(&page.html, &normalized, Local::now().date_naive())?;

        self.chapter_urls = chapter_urls(&site, &id, metadata.chapter_count);
        info!(
            url = %normalized,
            title = %metadata.title,
            chapters = metadata.chapter_count,
            fetcher = page.fetcher,
            "Story scanned"
        );

        if let Some(story) = self.story.as_mut() {
            story.metadata = Some(metadata);
        }
        Ok(())
    }

    async fn try_extract_chapter(&self, index: usize) -> Result<Chapter, ExtractError> {
        if index == 0 || index > self.chapter_urls.len() {
            return Err(ExtractError::ChapterOutOfRange {
                index,
                available: self.chapter_urls.len(),
            });
        }

        let url = &self.chapter_urls[index - 1];
        let page = self.fetch(url).await?;
        parse_chapter(&page.html)
    }

    async fn scan_author(&self, url: &str) -> Result<Vec<String>, ExtractError> {
        let id = user_id(url).ok_or_else(|| ExtractError::UnsupportedUrl(url.to_string()))?;
        let site = site_url(url).ok_or_else(|| ExtractError::UnsupportedUrl(url.to_string()))?;

        let page = self.fetch(&format!("{}/u/{}/", site, id)).await?;
        let ids = parse_author_listing(&page.html);

        Ok(ids.iter().map(|id| story_url(&site, id)).collect())
    }

    /// Walk every page of a collection, in order
    ///
    /// The first page tells how many pages there are, so pages are fetched
    /// strictly one after another. Any failed page aborts the whole scan.
    async fn scan_collection(&self, url: &str) -> Result<Vec<String>, ExtractError> {
        let (name, id) = collection_name_and_id(url)
            .ok_or_else(|| ExtractError::UnsupportedUrl(url.to_string()))?;
        let site = site_url(url).ok_or_else(|| ExtractError::UnsupportedUrl(url.to_string()))?;
        let collection_url = format!("{}/community/{}/{}", site, name, id);

        let first = self.fetch(&collection_page_url(&collection_url, 1)).await?;
        let (last_index, mut ids) = {
            let document = first.document();
            (
                last_page_index(&document),
                listing_story_ids(&document, collection_entry_selector()),
            )
        };

        for index in 2..=last_index {
            let page = self.fetch(&collection_page_url(&collection_url, index)).await?;
            ids.extend(listing_story_ids(&page.document(), collection_entry_selector()));
        }

        info!(url, pages = last_index, stories = ids.len(), "Collection scanned");
        Ok(ids.iter().map(|id| story_url(&site, id)).collect())
    }
}

#[async_trait]
impl Extractor for FfnetExtractor {
    fn supported_hostnames(&self) -> Vec<String> {
        FFNET_HOSTNAMES
            .iter()
            .map(|host| host.to_string())
            .chain(self.extra_hostnames.iter().cloned())
            .collect()
    }

    fn initialize(&mut self, url: &str) {
        self.story = Some(Story::new(url));
        self.chapter_urls.clear();
    }

    fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    fn story_mut(&mut self) -> Option<&mut Story> {
        self.story.as_mut()
    }

    fn chapter_urls(&self) -> &[String] {
        &self.chapter_urls
    }

    async fn scan_story(&mut self) -> bool {
        match self.try_scan_story().await {
            Ok(()) => true,
            Err(e) => {
                let url = self.story.as_ref().map(|story| story.url.as_str()).unwrap_or("");
                error!(url, error = %e, "Story scan failed");
                false
            }
        }
    }

    async fn extract_chapter(&self, index: usize) -> Option<Chapter> {
        match self.try_extract_chapter(index).await {
            Ok(chapter) => Some(chapter),
            Err(e) => {
                let declared = self
                    .story
                    .as_ref()
                    .and_then(|story| story.metadata.as_ref())
                    .map(|metadata| metadata.chapter_count)
                    .unwrap_or(0);
                let url = self.chapter_urls.get(index.wrapping_sub(1)).map(String::as_str);
                error!(index, declared, url, error = %e, "Chapter extraction failed");
                None
            }
        }
    }

    async fn scan_channel(&self, url: &str) -> Option<Vec<String>> {
        if url.is_empty() || !self.supports(url) {
            return None;
        }

        let result = if url.contains("/community/") {
            self.scan_collection(url).await
        } else {
            self.scan_author(url).await
        };

        match result {
            Ok(urls) => Some(urls),
            Err(e) => {
                error!(url, error = %e, "Channel scan failed");
                None
            }
        }
    }

    async fn shutdown(&self) {
        self.chain.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_hostnames() {
        let extractor = FfnetExtractor::builder()
            .hostname("Mirror.Example")
            .build()
            .unwrap();
        assert_eq!(
            extractor.supported_hostnames(),
            vec!["fanfiction.net", "fictionpress.com", "mirror.example"]
        );
        assert!(extractor.supports("https://www.fanfiction.net/s/1/"));
        assert!(extractor.supports("https://m.fictionpress.com/s/1/"));
        assert!(extractor.supports("https://mirror.example/s/1/"));
        assert!(!extractor.supports("https://archiveofourown.org/works/1"));
    }

    #[test]
    fn test_builder_chain() {
        let extractor = FfnetExtractor::builder().solver_port(8191).build().unwrap();
        assert_eq!(extractor.chain().names(), vec!["flaresolverr", "direct"]);

        let extractor = FfnetExtractor::builder().build().unwrap();
        assert_eq!(extractor.chain().names(), vec!["direct"]);
    }

    #[tokio::test]
    async fn test_scan_story_requires_initialize() {
        let mut extractor = FfnetExtractor::builder().build().unwrap();
        assert!(!extractor.scan_story().await);
    }

    #[tokio::test]
    async fn test_extract_chapter_out_of_range() {
        let mut extractor = FfnetExtractor::builder().build().unwrap();
        extractor.initialize("https://www.fanfiction.net/s/1/");
        assert!(extractor.extract_chapter(1).await.is_none());
        assert!(extractor.extract_chapter(0).await.is_none());
    }

    #[tokio::test]
    async fn test_scan_channel_rejects_foreign_hosts() {
        let extractor = FfnetExtractor::builder().build().unwrap();
        assert!(extractor.scan_channel("").await.is_none());
        assert!(extractor
            .scan_channel("https://archiveofourown.org/users/someone")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_scan_channel_rejects_unknown_paths() {
        let extractor = FfnetExtractor::builder().build().unwrap();
        assert!(extractor
            .scan_channel("https://www.fanfiction.net/book/Some-Fandom/")
            .await
            .is_none());
    }
}
