//! Date resolution for story headers
//!
//! Headers carry dates in two ways: as `data-xutime` Unix timestamps on
//! `<span>` elements, and as free text in whatever format the page locale
//! produced. Timestamps are read with [`timestamp_to_date`]; free text goes
//! through a [`DateParser`], an ordered list of [`DateFormat`] strategies
//! where the first one that both matches and parses wins.

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Canonical output format for every resolved date
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Patterns for a date right after a `Label:` marker, in priority order
static LABELED_CANDIDATES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Numeric: m/d/yyyy, m/d/yy, m/d
        r"^\d{1,2}/\d{1,2}(?:/\d{2,4})?",
        // Month name: Mar 31, 2011 / March 31 2011
        r"^[A-Za-z]{3,9}\s+\d{1,2},?\s+\d{4}",
        // ISO: 2011-03-31
        r"^\d{4}-\d{1,2}-\d{1,2}",
        // Day first: 31 Mar 2011 / 31 March 2011
        r"^\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4}",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static DEFAULT_PARSER: LazyLock<DateParser> = LazyLock::new(|| {
    let formats = [
        ("us_numeric", r"^\d{1,2}/\d{1,2}/\d{4}$", "%m/%d/%Y", false),
        ("us_numeric_short_year", r"^\d{1,2}/\d{1,2}/\d{2}$", "%m/%d/%y", false),
        ("us_month_day", r"^\d{1,2}/\d{1,2}$", "%m/%d", true),
        ("abbrev_month_comma", r"^[A-Za-z]{3}\s+\d{1,2},\s*\d{4}$", "%b %d, %Y", false),
        ("abbrev_month", r"^[A-Za-z]{3}\s+\d{1,2}\s+\d{4}$", "%b %d %Y", false),
        ("full_month_comma", r"^[A-Za-z]{4,9}\s+\d{1,2},\s*\d{4}$", "%B %d, %Y", false),
        ("full_month", r"^[A-Za-z]{4,9}\s+\d{1,2}\s+\d{4}$", "%B %d %Y", false),
        ("iso", r"^\d{4}-\d{1,2}-\d{1,2}$", "%Y-%m-%d", false),
        ("day_first_abbrev", r"^\d{1,2}\s+[A-Za-z]{3}\s+\d{4}$", "%d %b %Y", false),
        ("day_first_full", r"^\d{1,2}\s+[A-Za-z]{4,9}\s+\d{4}$", "%d %B %Y", false),
    ];

    let mut parser = DateParser::empty();
    for (name, shape, format, implied_year) in formats {
        let date_format = DateFormat::new(name, shape, format).unwrap();
        parser.push(if implied_year {
            date_format.with_implied_year()
        } else {
            date_format
        });
    }
    parser
});

/// One date-parsing strategy: a shape guard plus a chrono format string
#[derive(Debug, Clone)]
pub struct DateFormat {
    name: &'static str,
    shape: Regex,
    format: &'static str,
    implied_year: bool,
}

impl DateFormat {
    /// Create a strategy that accepts text matching `shape` and parses it with `format`
    pub fn new(
        name: &'static str,
        shape: &str,
        format: &'static str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            shape: Regex::new(shape)?,
            format,
            implied_year: false,
        })
    }

    /// The format carries no year; the current year is assumed
    pub fn with_implied_year(mut self) -> Self {
        self.implied_year = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parse `text` if it has this strategy's shape
    pub fn parse(&self, text: &str, today: NaiveDate) -> Option<NaiveDate> {
        let text = text.trim();
        if !self.shape.is_match(text) {
            return None;
        }

        if self.implied_year {
            let dated = format!("{} {}", text, today.year());
            let format = format!("{} %Y", self.format);
            NaiveDate::parse_from_str(&dated, &format).ok()
        } else {
            NaiveDate::parse_from_str(text, self.format).ok()
        }
    }
}

/// Ordered list of date strategies
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<DateFormat>,
}

impl Default for DateParser {
    fn default() -> Self {
        DEFAULT_PARSER.clone()
    }
}

impl DateParser {
    /// Parser with no strategies registered
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Register a strategy after the existing ones
    pub fn push(&mut self, format: DateFormat) {
        self.formats.push(format);
    }

    pub fn formats(&self) -> &[DateFormat] {
        &self.formats
    }

    /// First successful parse across the registered strategies
    pub fn parse(&self, text: &str, today: NaiveDate) -> Option<NaiveDate> {
        self.formats.iter().find_map(|format| {
            let parsed = format.parse(text, today)?;
            tracing::trace!(format = format.name(), text, "Parsed date");
            Some(parsed)
        })
    }

    /// Find and parse the date following `label:` in `text`
    pub fn extract_labeled(&self, text: &str, label: &str, today: NaiveDate) -> Option<NaiveDate> {
        if text.is_empty() {
            return None;
        }

        let marker = format!("{}:", label);
        let tails: Vec<&str> = text
            .match_indices(&marker)
            .map(|(start, _)| text[start + marker.len()..].trim_start())
            .collect();

        // A candidate's first hit wins, as long as it parses
        LABELED_CANDIDATES.iter().find_map(|candidate| {
            let found = tails.iter().find_map(|tail| candidate.find(tail))?;
            self.parse(found.as_str(), today)
        })
    }
}

/// Convert a Unix timestamp (seconds, as text) to a UTC calendar date
pub fn timestamp_to_date(timestamp: &str) -> Option<NaiveDate> {
    let seconds: i64 = timestamp.trim().parse().ok()?;
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

/// Parse `text` with the default strategies and render it as `YYYY-MM-DD`
pub fn parse_date_string(text: &str, today: NaiveDate) -> Option<String> {
    DEFAULT_PARSER
        .parse(text, today)
        .map(|date| date.format(CANONICAL_FORMAT).to_string())
}

/// Find the date following `label:` using the default strategies
pub fn extract_labeled_date(text: &str, label: &str, today: NaiveDate) -> Option<NaiveDate> {
    DEFAULT_PARSER.extract_labeled(text, label, today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_timestamp_to_date() {
        assert_eq!(
            timestamp_to_date("1301572800"),
            NaiveDate::from_ymd_opt(2011, 3, 31)
        );
        assert_eq!(
            timestamp_to_date(" 1341403200 "),
            NaiveDate::from_ymd_opt(2012, 7, 4)
        );
        assert_eq!(timestamp_to_date(""), None);
        assert_eq!(timestamp_to_date("yesterday"), None);
    }

    #[test]
    fn test_parse_date_string_formats() {
        let inputs = [
            "3/31/2011",
            "03/31/2011",
            "3/31/11",
            "Mar 31, 2011",
            "Mar 31 2011",
            "March 31, 2011",
            "March 31 2011",
            "2011-03-31",
            "31 Mar 2011",
            "31 March 2011",
        ];
        for input in inputs {
            assert_eq!(
                parse_date_string(input, today()).as_deref(),
                Some("2011-03-31"),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_parse_date_string_implied_year() {
        assert_eq!(
            parse_date_string("3/31", today()).as_deref(),
            Some("2024-03-31")
        );
    }

    #[test]
    fn test_parse_date_string_rejects_garbage() {
        assert_eq!(parse_date_string("", today()), None);
        assert_eq!(parse_date_string("13/45/2011", today()), None);
        assert_eq!(parse_date_string("Smarch 31, 2011", today()), None);
        assert_eq!(parse_date_string("yesterday", today()), None);
    }

    #[test]
    fn test_parse_date_string_canonical_is_fixed_point() {
        for input in ["2011-03-31", "1999-12-01", "2020-02-29"] {
            assert_eq!(parse_date_string(input, today()).as_deref(), Some(input));
        }
    }

    #[test]
    fn test_extract_labeled_date() {
        let expected = NaiveDate::from_ymd_opt(2011, 3, 31);
        for text in [
            "Rated: T - Words: 1,000 - Published: 3/31/2011 - id: 1",
            "Rated: T - Words: 1,000 - Published: Mar 31, 2011 - id: 1",
            "Rated: T - Words: 1,000 - Published: 2011-03-31 - id: 1",
            "Rated: T - Words: 1,000 - Published: 31 March 2011 - id: 1",
        ] {
            assert_eq!(extract_labeled_date(text, "Published", today()), expected);
        }
    }

    #[test]
    fn test_extract_labeled_date_picks_right_label() {
        let text = "Updated: 7/4/2012 - Published: 3/31/2011";
        assert_eq!(
            extract_labeled_date(text, "Updated", today()),
            NaiveDate::from_ymd_opt(2012, 7, 4)
        );
        assert_eq!(
            extract_labeled_date(text, "Published", today()),
            NaiveDate::from_ymd_opt(2011, 3, 31)
        );
        assert_eq!(extract_labeled_date(text, "Completed", today()), None);
    }

    #[test]
    fn test_extract_labeled_date_skips_undated_marker() {
        let text = "Published: unknown - Words: 10 - Published: Mar 31, 2011";
        assert_eq!(
            extract_labeled_date(text, "Published", today()),
            NaiveDate::from_ymd_opt(2011, 3, 31)
        );
        assert_eq!(extract_labeled_date("Published:", "Published", today()), None);
        assert_eq!(extract_labeled_date("Published 3/31/2011", "Published", today()), None);
    }

    #[test]
    fn test_custom_format_is_tried_last() {
        let mut parser = DateParser::default();
        assert_eq!(parser.parse("31.03.2011", today()), None);

        parser.push(DateFormat::new("dotted", r"^\d{1,2}\.\d{1,2}\.\d{4}$", "%d.%m.%Y").unwrap());
        assert_eq!(
            parser.parse("31.03.2011", today()),
            NaiveDate::from_ymd_opt(2011, 3, 31)
        );
        assert_eq!(parser.formats().last().map(DateFormat::name), Some("dotted"));
    }
}
