// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One raw entry as parsed out of an RSS/Atom document. Every field is
/// optional at this layer; the normalizer decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// RSS `pubDate` / Atom `published`, verbatim.
    pub published: Option<String>,
    /// Atom `updated`, verbatim. Used when `published` is missing or unparsable.
    pub updated: Option<String>,
    /// Nested `<source>` title (Google News style attribution).
    pub source_title: Option<String>,
    pub summary: Option<String>,
}

/// The normalized, validated unit the pipeline produces.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    /// Canonical URL; identity key for deduplication.
    pub link: String,
    /// Publisher name; "unknown source" when the upstream entry omits it.
    pub source: String,
    pub published_at: DateTime<Utc>,
    /// Trust score on the 0..=10 scale, assigned by the scorer.
    pub reliability: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// True only for items produced by the recency fallback, which is exempt
    /// from the target-date invariant.
    #[serde(default)]
    pub is_fallback: bool,
}

/// One configured feed: a display name plus the URL to fetch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

/// Transport seam: fetch + parse one syndication URL into raw entries.
/// Tests substitute stub implementations; production uses `HttpFeedFetcher`.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<RawEntry>>;
}
