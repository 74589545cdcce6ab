// src/ingest/feed.rs
//
// One HTTP GET per source, parsed as RSS 2.0 or Atom into `RawEntry`s.
// Any failure here is scoped to the single source; the caller decides
// how to degrade.

use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{FeedFetcher, RawEntry};

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}

/// `<source url="...">Publisher</source>` — Google News attributes each item
/// to the original publisher this way.
#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    source: Option<AtomSource>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomSource {
    title: Option<String>,
}

/// Feeds routinely carry HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse a syndication document into raw entries. Tries RSS 2.0 first, then
/// Atom; both shapes tolerate absent fields.
pub fn parse_feed_document(body: &str) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(body);

    let entries = if let Ok(rss) = from_str::<Rss>(&xml) {
        rss.channel
            .item
            .into_iter()
            .map(|it| RawEntry {
                title: it.title,
                link: it.link,
                published: it.pub_date,
                updated: None,
                source_title: it.source.and_then(|s| s.name),
                summary: it.description,
            })
            .collect()
    } else {
        let feed: AtomFeed = from_str(&xml).context("parsing feed as rss and atom both failed")?;
        feed.entry
            .into_iter()
            .map(|en| RawEntry {
                title: en.title,
                link: pick_atom_link(&en.link),
                published: en.published,
                updated: en.updated,
                source_title: en.source.and_then(|s| s.title),
                summary: en.summary,
            })
            .collect::<Vec<_>>()
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_parse_ms").record(ms);
    counter!("digest_entries_total").increment(entries.len() as u64);

    Ok(entries)
}

/// Atom entries may carry several `<link>`s; `rel="alternate"` (or no rel)
/// is the article link.
fn pick_atom_link(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.clone())
}

/// Production transport: reqwest with a caller-supplied User-Agent and
/// per-request timeout.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawEntry>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("non-2xx from {url}"))?;
        let body = resp.text().await.context("reading feed body")?;
        parse_feed_document(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_items_with_nested_source() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>search</title>
<item>
  <title>Lithium mine expands</title>
  <link>https://example.test/lithium</link>
  <pubDate>Tue, 05 Mar 2024 12:30:00 GMT</pubDate>
  <source url="https://miningweekly.test">Mining Weekly</source>
</item>
</channel></rss>"#;
        let entries = parse_feed_document(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://example.test/lithium"));
        assert_eq!(entries[0].source_title.as_deref(), Some("Mining Weekly"));
    }

    #[test]
    fn atom_entries_pick_alternate_link() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
<entry>
  <title>Nickel prices slide</title>
  <link rel="self" href="https://example.test/self"/>
  <link rel="alternate" href="https://example.test/nickel"/>
  <updated>2024-03-05T09:00:00Z</updated>
  <summary>Prices fell again.</summary>
</entry>
</feed>"#;
        let entries = parse_feed_document(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://example.test/nickel"));
        assert!(entries[0].published.is_none());
        assert_eq!(entries[0].updated.as_deref(), Some("2024-03-05T09:00:00Z"));
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(parse_feed_document("<html>not a feed</html>").is_err());
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let xml = r#"<rss version="2.0"><channel><item><title>bare</title></item></channel></rss>"#;
        let entries = parse_feed_document(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].link.is_none());
        assert!(entries[0].published.is_none());
    }
}
