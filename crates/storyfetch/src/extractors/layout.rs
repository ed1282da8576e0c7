//! Parsing for the fanfiction.net / fictionpress.com page family
//!
//! Everything here is synchronous and works on HTML text, so it can be tested
//! without a network and never keeps a parsed document alive across an await.

use crate::convert::clean_whitespace;
use crate::dates::{extract_labeled_date, timestamp_to_date};
use crate::error::ExtractError;
use crate::types::{Chapter, StoryMetadata};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

static HEADER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#profile_top").unwrap());
static TIMESTAMP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span[data-xutime]").unwrap());
static SELECTED_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option[selected]").unwrap());
static STORY_TEXT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#storytext").unwrap());
static AUTHOR_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.mystories").unwrap());
static COLLECTION_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.z-list").unwrap());
static STORY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.stitle").unwrap());
static PAGER_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("center > a").unwrap());

static STORY_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/s/(\d+)").unwrap());
static USER_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/u/(\d+)").unwrap());
static COLLECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/community/([a-zA-Z0-9-]+)/(\d+)").unwrap());
static CHAPTER_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Chapters:\s*(\d+)").unwrap());
static WORD_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Words:\s*([\d,]+)").unwrap());
static CHAPTER_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());

/// Story ID from any story or chapter URL
pub fn story_id(url: &str) -> Option<String> {
    STORY_ID.captures(url).map(|caps| caps[1].to_string())
}

/// User ID from an author page URL
pub fn user_id(url: &str) -> Option<String> {
    USER_ID.captures(url).map(|caps| caps[1].to_string())
}

/// Collection name and ID from a community URL
pub fn collection_name_and_id(url: &str) -> Option<(String, String)> {
    COLLECTION
        .captures(url)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Story URL for `id` on `site`
pub fn story_url(site: &str, id: &str) -> String {
    format!("{}/s/{}/", site, id)
}

/// One URL per chapter, `{site}/s/{id}/{index}/` for index 1 to `count`
pub fn chapter_urls(site: &str, id: &str, count: usize) -> Vec<String> {
    (1..=count)
        .map(|index| format!("{}/s/{}/{}/", site, id, index))
        .collect()
}

/// Listing page `index` of a collection rooted at `collection_url`
///
/// The zeros are the site's filter slots (rating, language, genre...), all
/// left at "any". `99` selects every rating.
pub fn collection_page_url(collection_url: &str, index: u32) -> String {
    format!("{}/99/0/{}/0/0/0/0/", collection_url, index)
}

/// Metadata from a story's main page
///
/// The header (`#profile_top`) is read as lines of text with blank lines
/// dropped: title, `By: author`, summary, then the stats line holding
/// `Rated: ... - Chapters: N - Words: N - Updated: ... - Published: ...`.
/// Only lines from the fourth on are considered for the stats line.
pub fn parse_story_header(
    html: &str,
    url: &str,
    today: NaiveDate,
) -> Result<StoryMetadata, ExtractError> {
    let document = Html::parse_document(html);
    let header = document
        .select(&HEADER)
        .next()
        .ok_or(ExtractError::MissingElement("#profile_top"))?;

    let text = header.text().collect::<String>().replace("Follow/Fav", "");
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let title = lines
        .first()
        .map(|line| line.to_string())
        .ok_or(ExtractError::MissingField("title"))?;
    let author = lines
        .get(1)
        .map(|line| line.trim_start_matches("By:").trim().to_string())
        .unwrap_or_default();
    // Already decoded text; only the whitespace needs tidying
    let summary = lines
        .get(2)
        .map(|line| clean_whitespace(line))
        .unwrap_or_default();
    // Title and summary are free text and may mention "Words:" themselves
    let stats = lines
        .iter()
        .skip(3)
        .find(|line| line.contains("Words:"))
        .or_else(|| lines.get(3))
        .copied()
        .unwrap_or_default();

    let word_count = WORD_COUNT
        .captures(stats)
        .and_then(|caps| caps[1].replace(',', "").parse::<u64>().ok())
        .ok_or(ExtractError::MissingField("Words"))?;

    // Single-chapter stories leave the field out
    let chapter_count = CHAPTER_COUNT
        .captures(stats)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .unwrap_or(1);

    let (updated, published) = header_dates(header, stats, today);
    let date_published = published.unwrap_or_else(|| {
        warn!(url, "Date published not found, using current date");
        today
    });
    let date_updated = updated.unwrap_or(date_published);

    Ok(StoryMetadata {
        url: url.to_string(),
        title,
        author,
        summary,
        date_published,
        date_updated,
        chapter_count,
        word_count,
    })
}

/// Resolve `(updated, published)` for a header
///
/// Timestamps win over text. With two or more timestamp spans the last one is
/// "published" and the one before it "updated"; a lone span is "published".
fn header_dates(
    header: ElementRef<'_>,
    stats: &str,
    today: NaiveDate,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let stamps: Vec<&str> = header
        .select(&TIMESTAMP)
        .filter_map(|span| span.value().attr("data-xutime"))
        .collect();

    let (updated_stamp, published_stamp) = match stamps.as_slice() {
        [] => (None, None),
        [published] => (None, Some(*published)),
        [.., updated, published] => (Some(*updated), Some(*published)),
    };

    let published = published_stamp
        .and_then(timestamp_to_date)
        .or_else(|| extract_labeled_date(stats, "Published", today));
    let updated = match updated_stamp {
        Some(stamp) => timestamp_to_date(stamp),
        // A lone timestamp means the story was never updated
        None if published_stamp.is_some() => None,
        None => extract_labeled_date(stats, "Updated", today),
    };

    (updated, published)
}

/// Title and body of a chapter page
pub fn parse_chapter(html: &str) -> Result<Chapter, ExtractError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&SELECTED_OPTION)
        .next()
        .map(|option| option.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .map(|title| match CHAPTER_NUMBER.captures(&title) {
            Some(caps) => caps[1].trim().to_string(),
            None => title,
        });

    let body = document
        .select(&STORY_TEXT)
        .next()
        .ok_or(ExtractError::MissingElement("#storytext"))?;

    Ok(Chapter {
        title,
        content: body.inner_html().trim().to_string(),
    })
}

/// Story IDs listed on an author page
pub fn parse_author_listing(html: &str) -> Vec<String> {
    listing_story_ids(&Html::parse_document(html), &AUTHOR_ENTRY)
}

/// Story IDs listed on one collection page
pub fn parse_collection_listing(html: &str) -> Vec<String> {
    listing_story_ids(&Html::parse_document(html), &COLLECTION_ENTRY)
}

/// Index of a collection's last page, read off its "Last" pager link
///
/// No link means a single page.
pub fn parse_last_page_index(html: &str) -> u32 {
    last_page_index(&Html::parse_document(html))
}

pub(crate) fn listing_story_ids(document: &Html, entry: &Selector) -> Vec<String> {
    let mut ids = Vec::new();

    for element in document.select(entry) {
        let Some(href) = element
            .select(&STORY_LINK)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            warn!("Failed to retrieve story URL from listing entry");
            continue;
        };

        match story_id(href) {
            Some(id) => ids.push(id),
            None => warn!(href, "Failed to retrieve story ID from its URL"),
        }
    }

    ids
}

pub(crate) fn last_page_index(document: &Html) -> u32 {
    let href = document
        .select(&PAGER_LINK)
        .find(|link| link.text().collect::<String>().trim() == "Last")
        .and_then(|link| link.value().attr("href"));
    let Some(href) = href else {
        return 1;
    };

    // /community/{name}/{id}/99/0/{page}/0/0/0/0/
    let parts: Vec<&str> = href.split('/').collect();
    if parts.len() <= 8 {
        return 1;
    }

    match parts[parts.len() - 6].parse::<u32>() {
        Ok(index) if index >= 1 => index,
        _ => {
            warn!(href, "Malformed last page link, assuming a single page");
            1
        }
    }
}

pub(crate) fn collection_entry_selector() -> &'static Selector {
    &COLLECTION_ENTRY
}
