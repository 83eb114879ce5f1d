//! Data models shared by every stage of ingestion.
//!
//! - [`RawExtraction`]: what one extractor pass pulled out of one page node
//! - [`CanonicalArticle`]: the single normalized article shape
//! - [`BatchResult`]: articles plus per-source outcomes for one run
//!
//! The canonical types serialize with camelCase field names, which is the
//! shape the storage collaborator and the JSON output expect.

use crate::error::ExtractionFault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a registered news source.
///
/// The set is open: any id registered in the
/// [`SourceRegistry`](crate::registry::SourceRegistry) is valid. Ids are
/// lowercase so that `FT` from a config file and [`SourceId::FT`] agree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SourceId(Cow<'static, str>);

impl SourceId {
    pub const FT: SourceId = SourceId(Cow::Borrowed("ft"));
    pub const BLOOMBERG: SourceId = SourceId(Cow::Borrowed("bloomberg"));
    pub const YAHOO: SourceId = SourceId(Cow::Borrowed("yahoo"));
    pub const REUTERS: SourceId = SourceId(Cow::Borrowed("reuters"));

    pub fn new(id: impl AsRef<str>) -> Self {
        SourceId(Cow::Owned(id.as_ref().trim().to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        SourceId::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        SourceId::new(s)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0.into_owned()
    }
}

/// Which extraction routine a page needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    /// A teaser on a page listing many articles.
    ListingItem,
    /// A single article page.
    FullArticle,
    /// A teaser on a ticker-specific news feed.
    TickerFeedItem,
}

impl PageKind {
    /// Listing and ticker feed pages hold many items; article pages hold one.
    pub fn is_list(self) -> bool {
        !matches!(self, PageKind::FullArticle)
    }
}

/// Source-specific field name to value, as read from one page node.
///
/// A missing key means the field was absent from the markup. Keys are the
/// field names the source's layout declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtraction {
    pub fields: BTreeMap<&'static str, String>,
    /// Ticker-like tokens, first-seen order, unique within the page node.
    pub tickers: Vec<String>,
}

impl RawExtraction {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: &'static str, value: String) {
        self.fields.insert(field, value);
    }
}

/// Natural key of an article: two extractions with the same key are the same
/// article.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleKey {
    pub source: SourceId,
    pub url: String,
}

/// The unified article record every source is mapped into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalArticle {
    pub title: String,
    /// Absolute, fragment-free url.
    pub url: String,
    pub summary: String,
    /// ISO-8601 when the source date parsed, otherwise the raw text.
    pub published_at: Option<String>,
    pub image_url: Option<String>,
    pub source: SourceId,
    pub category: String,
    pub author: Option<String>,
    pub tickers: Vec<String>,
    pub kind: PageKind,
    /// Body text; only full article pages carry it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
}

impl CanonicalArticle {
    pub fn key(&self) -> ArticleKey {
        ArticleKey {
            source: self.source.clone(),
            url: self.url.clone(),
        }
    }

    /// Merge a later extraction of the same article into this record.
    ///
    /// Non-empty values from `later` win; tickers are unioned keeping this
    /// record's order first.
    pub fn absorb(&mut self, later: CanonicalArticle) {
        debug_assert_eq!(self.key(), later.key());
        self.title = later.title;
        if !later.summary.is_empty() {
            self.summary = later.summary;
        }
        if later.published_at.is_some() {
            self.published_at = later.published_at;
        }
        if later.image_url.is_some() {
            self.image_url = later.image_url;
        }
        if !later.category.is_empty() {
            self.category = later.category;
        }
        if later.author.is_some() {
            self.author = later.author;
        }
        if !later.content.is_empty() {
            self.content = later.content;
        }
        for t in later.tickers {
            if !self.tickers.contains(&t) {
                self.tickers.push(t);
            }
        }
        self.kind = later.kind;
    }
}

/// What happened to one source during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub last_error: Option<String>,
    /// Not started because the run ran out of time or was cancelled.
    pub skipped: bool,
    pub warnings: Vec<String>,
}

impl SourceOutcome {
    /// Fold one unit result (item, page or source) into the tallies.
    ///
    /// Successes are counted by the caller once it knows whether the value
    /// was new; only failures are counted here.
    pub fn tally<T>(&mut self, result: Result<T, ExtractionFault>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(fault) => {
                self.failed += 1;
                self.last_error = Some(fault.to_string());
                None
            }
        }
    }
}

/// Everything one orchestrator run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Page order within a source; no ordering across sources.
    pub articles: Vec<CanonicalArticle>,
    pub outcomes: BTreeMap<SourceId, SourceOutcome>,
}

impl BatchResult {
    pub fn articles_from<'a>(
        &'a self,
        source: &'a SourceId,
    ) -> impl Iterator<Item = &'a CanonicalArticle> + 'a {
        self.articles.iter().filter(move |a| &a.source == source)
    }

    /// True only when every source failed and nothing was produced.
    pub fn is_total_failure(&self) -> bool {
        self.articles.is_empty()
            && !self.outcomes.is_empty()
            && self
                .outcomes
                .values()
                .all(|o| o.failed > 0 && o.succeeded == 0)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.values().map(|o| o.failed).sum()
    }
}
