//! Shared types used across the tubesift pipeline.
//!
//! This module defines the domain types that flow between the collector,
//! the reconciler and the sinks, plus the `VideoUrl` newtype that serves
//! as the identity key of a record.

use crate::error::CoreError;
use crate::views::parse_views;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static WATCH_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://(www\.)?youtube\.com/watch\?v=[A-Za-z0-9_-]{11}(&.*)?$")
        .expect("valid regex")
});

/// Base used to resolve relative hrefs extracted from result cards.
const WATCH_URL_BASE: &str = "https://www.youtube.com";

/// Newtype for canonical video watch URLs.
///
/// The url is the identity key of a record: no two stored records may share
/// one, across the whole lifetime of a store. Validation enforces the
/// canonical watch-URL shape so malformed extractions never become keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoUrl(String);

impl VideoUrl {
    /// Create a new `VideoUrl` from an absolute URL string.
    ///
    /// # Errors
    /// Returns error if the URL does not match the canonical watch-URL
    /// pattern.
    pub fn new(url: impl Into<String>) -> Result<Self, CoreError> {
        let url = url.into();
        if WATCH_URL_REGEX.is_match(&url) {
            Ok(Self(url))
        } else {
            Err(CoreError::Validation(format!(
                "invalid video url: expected a canonical watch URL, got '{url}'"
            )))
        }
    }

    /// Create a `VideoUrl` from an href as found in the DOM.
    ///
    /// Result cards carry relative hrefs (`/watch?v=...`); those are joined
    /// against the platform base before validation.
    pub fn from_href(href: &str) -> Result<Self, CoreError> {
        if href.starts_with('/') {
            Self::new(format!("{WATCH_URL_BASE}{href}"))
        } else {
            Self::new(href)
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One result card as extracted from the DOM, before normalization.
///
/// Ephemeral: owned by the collector and discarded once turned into a
/// [`NormalizedRecord`]. A field the layout no longer exposes is carried as
/// `None` rather than failing the card.
#[derive(Debug, Clone)]
pub struct RawResultCard {
    /// Video title; empty if the layout changed under the selector
    pub title: String,
    /// Canonical video URL, the identity key
    pub url: VideoUrl,
    /// Raw view-count text, e.g. "1.2M回"
    pub views_text: Option<String>,
    /// Channel name, if present on the card
    pub channel_name: Option<String>,
    /// Relative upload time text, e.g. "1日前"
    pub upload_time_text: Option<String>,
    /// Wall-clock epoch seconds at extraction time
    pub scrape_timestamp: f64,
}

/// The durable unit appended to a store.
///
/// `views_count` is `None` when the raw text was unparseable; it is never
/// silently zero unless the source literally read zero views. `saved_at` is
/// stamped by the reconciler, not at scrape time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Video title
    pub title: String,
    /// Canonical video URL, unique per record across the store lifetime
    pub url: VideoUrl,
    /// Raw view-count text as observed
    pub views_text: String,
    /// Parsed view count; `None` marks unparsed text
    pub views_count: Option<u64>,
    /// Channel name
    pub channel_name: Option<String>,
    /// Relative upload time text
    pub upload_time_text: Option<String>,
    /// Timestamp of persistence, set at reconcile time
    pub saved_at: Option<DateTime<Utc>>,
}

impl NormalizedRecord {
    /// Normalize a raw card: parse the view-count text, keep everything else.
    ///
    /// Unparseable view text degrades the record (`views_count: None`), it
    /// never drops it.
    #[must_use]
    pub fn from_raw(card: RawResultCard) -> Self {
        let views_count = card.views_text.as_deref().and_then(parse_views);
        Self {
            title: card.title,
            url: card.url,
            views_text: card.views_text.unwrap_or_default(),
            views_count,
            channel_name: card.channel_name,
            upload_time_text: card.upload_time_text,
            saved_at: None,
        }
    }
}

/// Outcome of a fully successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Cards collected from the page
    pub collected: usize,
    /// Records newly appended to the primary store
    pub new: usize,
    /// Records dropped as duplicates (in-batch or already stored)
    pub duplicates: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} collected, {} new, {} duplicate",
            self.collected, self.new, self.duplicates
        )
    }
}
