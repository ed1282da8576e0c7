//! Story, metadata and chapter containers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Metadata read from a story's header block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryMetadata {
    /// Canonical story URL
    pub url: String,
    pub title: String,
    pub author: String,
    /// Plain-text summary
    pub summary: String,
    pub date_published: NaiveDate,
    /// Equals `date_published` for stories that were never updated
    pub date_updated: NaiveDate,
    /// Declared chapter count (1 when the header omits it)
    pub chapter_count: usize,
    pub word_count: u64,
}

/// A single extracted chapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Inner HTML of the chapter body
    pub content: String,
}

/// A story and whatever chapters have been extracted so far
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    /// URL the story was requested with
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StoryMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
}

impl Story {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            metadata: None,
            chapters: Vec::new(),
        }
    }
}
