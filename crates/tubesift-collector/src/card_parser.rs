//! Extraction of result cards from rendered search-results HTML.
//!
//! A selector miss on a single field degrades the card, never the run: the
//! field is carried as `None` and a warning is emitted once per distinct
//! missing-field kind per run. A card without a usable video URL has no
//! identity and is dropped.

use crate::error::{CollectError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tubesift_core::{RawResultCard, VideoUrl};

/// View-count fragment inside a title link's aria-label, e.g. "1,234 回" or
/// "1.2M views".
static ARIA_VIEWS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:,\d+)*(?:\.\d+)?[KkMmBb千万億]?)\s*(?:回|views)").expect("valid regex")
});

/// Leading count in a metadata span, e.g. "8.2万回視聴".
static META_VIEWS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d,.]+[KkMmBb千万億]?)").expect("valid regex"));

/// CSS selectors for one result-card layout.
#[derive(Debug, Clone)]
pub struct CardSelectors {
    /// One selector per result card
    pub result_item: String,
    /// Title link inside a card; carries title, href and aria-label
    pub title_link: String,
    /// Channel name link
    pub channel: String,
    /// Metadata spans (view count, upload time)
    pub metadata: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            result_item: "ytd-video-renderer".to_string(),
            title_link: "a#video-title".to_string(),
            channel: "ytd-channel-name a".to_string(),
            metadata: "#metadata-line span".to_string(),
        }
    }
}

/// Warn-once-per-run tracker for missing card fields.
///
/// A layout change hits every card the same way; one warning per field kind
/// says everything a per-card flood would.
#[derive(Debug, Default)]
pub struct MissingFieldLog {
    seen: HashSet<&'static str>,
}

impl MissingFieldLog {
    /// Create an empty tracker for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a missing field, warning only the first time it is seen.
    pub fn note(&mut self, field: &'static str) {
        if self.seen.insert(field) {
            tracing::warn!(field, "Result card field missing; layout may have changed");
        }
    }

    /// Field kinds that went missing at least once this run.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<_> = self.seen.iter().copied().collect();
        fields.sort_unstable();
        fields
    }
}

/// Parser for result cards, generic over a selector set.
pub struct CardParser {
    result_item: Selector,
    title_link: Selector,
    channel: Selector,
    metadata: Selector,
}

impl CardParser {
    /// Build a parser from a selector set.
    pub fn new(selectors: &CardSelectors) -> Result<Self> {
        Ok(Self {
            result_item: parse_selector(&selectors.result_item)?,
            title_link: parse_selector(&selectors.title_link)?,
            channel: parse_selector(&selectors.channel)?,
            metadata: parse_selector(&selectors.metadata)?,
        })
    }

    /// Extract all result cards currently rendered in `html`.
    ///
    /// Cards without a valid video URL are skipped; all other field misses
    /// degrade the individual card.
    pub fn parse(&self, html: &str, missing: &mut MissingFieldLog) -> Vec<RawResultCard> {
        let document = Html::parse_document(html);
        let now = epoch_seconds();

        document
            .select(&self.result_item)
            .filter_map(|item| self.parse_card(&item, missing, now))
            .collect()
    }

    fn parse_card(
        &self,
        item: &ElementRef,
        missing: &mut MissingFieldLog,
        now: f64,
    ) -> Option<RawResultCard> {
        let title_link = item.select(&self.title_link).next();

        let url = title_link
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| VideoUrl::from_href(href).ok());
        let Some(url) = url else {
            // No identity key, nothing to store
            missing.note("url");
            return None;
        };

        let title = title_link
            .and_then(|el| el.value().attr("title"))
            .map(str::to_string)
            .unwrap_or_else(|| {
                missing.note("title");
                String::new()
            });

        // Primary source: the aria-label carries a spoken form of the count
        let mut views_text = title_link
            .and_then(|el| el.value().attr("aria-label"))
            .and_then(|label| {
                ARIA_VIEWS_REGEX
                    .captures(label)
                    .map(|c| c[1].to_string())
            });

        let metadata: Vec<String> = item
            .select(&self.metadata)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect();

        // Fallback: the metadata span that names views
        if views_text.is_none() {
            views_text = metadata
                .iter()
                .find(|text| text.contains("回視聴") || text.contains("views"))
                .and_then(|text| META_VIEWS_REGEX.captures(text).map(|c| c[1].to_string()));
        }
        if views_text.is_none() {
            missing.note("views");
        }

        let upload_time_text = metadata
            .iter()
            .find(|text| {
                !text.is_empty() && !text.contains("回視聴") && !text.contains("views")
            })
            .cloned();
        if upload_time_text.is_none() {
            missing.note("upload_time");
        }

        let channel_name = item
            .select(&self.channel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty());
        if channel_name.is_none() {
            missing.note("channel");
        }

        Some(RawResultCard {
            title,
            url,
            views_text,
            channel_name,
            upload_time_text,
            scrape_timestamp: now,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CollectError::SelectorInvalid {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
