//! Turns raw feed entries into candidate items.
//!
//! Body text and publication time are pulled out through short, ordered
//! chains of extraction strategies. Each step either yields a value or
//! passes, so the whole chain is testable without a network or a store.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use html_escape::decode_html_entities;

use crate::app::{Result, TributaryError};
use crate::domain::{CandidateItem, RawEntry};

/// One accepted encoding of an entry date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    Rfc3339,
    Rfc2822,
    /// A chrono format string. Tried with an offset first, then as naive UTC
    /// date-time, then as a bare date at midnight UTC.
    Pattern(String),
}

impl TimestampFormat {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rfc3339" | "iso8601" => Self::Rfc3339,
            "rfc2822" | "rfc822" => Self::Rfc2822,
            _ => Self::Pattern(name.to_string()),
        }
    }

    pub fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Rfc2822 => DateTime::parse_from_rfc2822(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Pattern(pattern) => DateTime::parse_from_str(value, pattern)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(value, pattern)
                        .ok()
                        .map(|naive| naive.and_utc())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(value, pattern)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc())
                }),
        }
    }
}

/// Where an entry body may come from, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodySource {
    Description,
    Summary,
    FirstContent,
}

const BODY_CHAIN: [BodySource; 3] = [
    BodySource::Description,
    BodySource::Summary,
    BodySource::FirstContent,
];

impl BodySource {
    fn extract(self, entry: &RawEntry) -> Option<&str> {
        match self {
            Self::Description => entry.description.as_deref(),
            Self::Summary => entry.summary.as_deref(),
            Self::FirstContent => entry.content.first().map(String::as_str),
        }
        .filter(|text| !text.trim().is_empty())
    }
}

/// Date fields, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    PubDate,
    Published,
    Updated,
}

const DATE_CHAIN: [DateField; 3] = [DateField::PubDate, DateField::Published, DateField::Updated];

impl DateField {
    fn extract(self, entry: &RawEntry) -> Option<&str> {
        match self {
            Self::PubDate => entry.pub_date.as_deref(),
            Self::Published => entry.published.as_deref(),
            Self::Updated => entry.updated.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    formats: Arc<[TimestampFormat]>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_formats([TimestampFormat::Rfc2822, TimestampFormat::Rfc3339])
    }

    pub fn with_formats<I>(formats: I) -> Self
    where
        I: IntoIterator<Item = TimestampFormat>,
    {
        Self {
            formats: formats.into_iter().collect(),
        }
    }

    /// Build from configured format names such as `"rfc2822"` or `"%Y-%m-%d"`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::with_formats(names.iter().map(|n| TimestampFormat::from_name(n.as_ref())))
    }

    /// Normalize one entry. Only a missing link is fatal for the entry;
    /// every other gap is filled with a fallback.
    pub fn normalize(
        &self,
        feed_id: i64,
        entry: &RawEntry,
        now: DateTime<Utc>,
    ) -> Result<CandidateItem> {
        let url = entry
            .link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .ok_or_else(|| {
                TributaryError::MalformedEntry(format!(
                    "entry {:?} has no link",
                    entry.title.as_deref().unwrap_or("")
                ))
            })?;

        let headline = entry
            .title
            .as_deref()
            .map(|t| decode_html_entities(t.trim()).to_string())
            .unwrap_or_default();

        let body = match Self::extract_body(entry) {
            Some(body) => body,
            None => {
                tracing::debug!(url, "Entry has no description, summary or content");
                String::new()
            }
        };

        let timestamp = self.extract_timestamp(entry).unwrap_or(now);

        Ok(CandidateItem {
            feed_id,
            url: url.to_string(),
            headline,
            body,
            timestamp,
        })
    }

    pub fn extract_body(entry: &RawEntry) -> Option<String> {
        BODY_CHAIN
            .iter()
            .find_map(|source| source.extract(entry))
            .map(|text| decode_html_entities(text.trim()).to_string())
    }

    pub fn extract_timestamp(&self, entry: &RawEntry) -> Option<DateTime<Utc>> {
        DATE_CHAIN
            .iter()
            .filter_map(|field| field.extract(entry))
            .find_map(|raw| self.formats.iter().find_map(|format| format.parse(raw)))
    }
}
