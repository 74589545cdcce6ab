// tests/ingest_pipeline.rs
//
// End-to-end pipeline runs against stub fetchers: duplicate collapse across
// sources, fallback activation, single-source failure isolation, default
// scoring.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use mining_news_digest::ingest::config::DigestConfig;
use mining_news_digest::ingest::types::{FeedFetcher, FeedSpec, RawEntry};
use mining_news_digest::ingest::{self, run_once};
use mining_news_digest::reliability::{ReliabilityTable, DEFAULT_SCORE, MAX_SCORE, MIN_SCORE};

#[derive(Clone)]
enum Feed {
    Entries(Vec<RawEntry>),
    Fail,
    Hang,
}

#[derive(Default)]
struct StubFetcher {
    feeds: HashMap<String, Feed>,
}

impl StubFetcher {
    fn with(mut self, url: &str, feed: Feed) -> Self {
        self.feeds.insert(url.to_string(), feed);
        self
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawEntry>> {
        match self.feeds.get(url) {
            Some(Feed::Entries(v)) => Ok(v.clone()),
            Some(Feed::Fail) => Err(anyhow!("connection refused")),
            Some(Feed::Hang) => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            None => Err(anyhow!("no stub for {url}")),
        }
    }
}

/// Run clock: 2024-03-06 12:00 UTC, so the target day in America/Bahia is
/// 2024-03-05.
fn run_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap()
}

fn entry(link: &str, published: &str, source: Option<&str>) -> RawEntry {
    RawEntry {
        title: Some(format!("story {link}")),
        link: Some(link.to_string()),
        published: Some(published.to_string()),
        source_title: source.map(str::to_string),
        ..Default::default()
    }
}

/// Published 2024-03-05 15:00 UTC = 12:00 in Bahia: on the target day.
fn on_target(link: &str, source: Option<&str>) -> RawEntry {
    entry(link, "2024-03-05T15:00:00Z", source)
}

fn spec(name: &str) -> FeedSpec {
    FeedSpec {
        name: name.to_string(),
        url: format!("https://{}.test/rss", name.to_lowercase().replace(' ', "-")),
    }
}

fn test_cfg(sources: Vec<FeedSpec>, fallback: Option<FeedSpec>) -> DigestConfig {
    let mut cfg = DigestConfig::default_seed();
    cfg.sources = sources;
    cfg.fallback_source = fallback;
    cfg.fallback_limit = 3;
    cfg.fetch_timeout_secs = 1;
    cfg.global_deadline_secs = 5;
    cfg
}

fn table() -> Arc<ReliabilityTable> {
    Arc::new(ReliabilityTable::default())
}

#[tokio::test]
async fn scenario_a_same_link_from_two_sources_yields_one_item() {
    let a = spec("Source A");
    let b = spec("Source B");
    let fetcher = StubFetcher::default()
        .with(&a.url, Feed::Entries(vec![on_target("https://x.test/same", None)]))
        .with(&b.url, Feed::Entries(vec![on_target("https://x.test/same", None)]));

    let cfg = test_cfg(vec![a, b], None);
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].link, "https://x.test/same");
    // duplicate resolved to the first-configured source's copy
    assert_eq!(items[0].source, "Source A");
    assert_eq!(stats.deduped, 1);
    assert!(!stats.fallback_used);
}

#[tokio::test]
async fn scenario_b_empty_day_activates_bounded_tagged_fallback() {
    let a = spec("Source A");
    let fb = spec("Fallback Feed");
    // the source only has old news; the fallback feed has plenty
    let old = entry("https://x.test/old", "2024-02-20T10:00:00Z", None);
    let recent: Vec<RawEntry> = (0..10)
        .map(|i| entry(&format!("https://fb.test/{i}"), "2024-03-06T08:00:00Z", None))
        .collect();
    let fetcher = StubFetcher::default()
        .with(&a.url, Feed::Entries(vec![old]))
        .with(&fb.url, Feed::Entries(recent));

    let cfg = test_cfg(vec![a], Some(fb));
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    assert!(stats.fallback_used);
    assert!(!items.is_empty());
    assert!(items.len() <= cfg.fallback_limit);
    assert!(items.iter().all(|i| i.is_fallback));
}

#[tokio::test(start_paused = true)]
async fn scenario_c_one_hanging_source_does_not_poison_the_rest() {
    let a = spec("Source A");
    let b = spec("Source B");
    let c = spec("Source C");
    let fetcher = StubFetcher::default()
        .with(&a.url, Feed::Entries(vec![on_target("https://x.test/a", None)]))
        .with(&b.url, Feed::Hang)
        .with(&c.url, Feed::Entries(vec![on_target("https://x.test/c", None)]));

    let cfg = test_cfg(vec![a, b, c], None);
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    let links: Vec<_> = items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(links, vec!["https://x.test/a", "https://x.test/c"]);
    assert_eq!(stats.source_errors, 1);
    assert!(!stats.fallback_used);
}

#[tokio::test]
async fn scenario_c_variant_hard_failure_is_isolated_too() {
    let a = spec("Source A");
    let b = spec("Source B");
    let fetcher = StubFetcher::default()
        .with(&a.url, Feed::Fail)
        .with(&b.url, Feed::Entries(vec![on_target("https://x.test/b", None)]));

    let cfg = test_cfg(vec![a, b], None);
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(stats.source_errors, 1);
}

#[tokio::test]
async fn scenario_d_unknown_source_gets_the_default_score() {
    let a = spec("Obscure Blog");
    let fetcher = StubFetcher::default().with(
        &a.url,
        Feed::Entries(vec![
            on_target("https://x.test/1", None),
            on_target("https://x.test/2", Some("Mining Weekly")),
        ]),
    );

    let cfg = test_cfg(vec![a], None);
    let (items, _) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    let unknown = items.iter().find(|i| i.source == "Obscure Blog").unwrap();
    assert_eq!(unknown.reliability, DEFAULT_SCORE);
    assert_ne!(unknown.reliability, MAX_SCORE);
    assert_ne!(unknown.reliability, MIN_SCORE);
    let known = items.iter().find(|i| i.source == "Mining Weekly").unwrap();
    assert_eq!(known.reliability, 8);
    // bounds hold for every output item
    assert!(items.iter().all(|i| i.reliability <= MAX_SCORE));
}

#[tokio::test]
async fn non_fallback_output_is_all_on_the_target_day() {
    let a = spec("Source A");
    let mixed = vec![
        on_target("https://x.test/keep", None),
        entry("https://x.test/before", "2024-03-04T23:00:00Z", None),
        // 02:00 UTC on the 6th is still 23:00 on the 5th in Bahia
        entry("https://x.test/late-utc", "2024-03-06T02:00:00Z", None),
        entry("https://x.test/after", "2024-03-06T12:00:00Z", None),
    ];
    let fetcher = StubFetcher::default().with(&a.url, Feed::Entries(mixed));

    let cfg = test_cfg(vec![a], None);
    let tz = cfg.tz().unwrap();
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    let links: Vec<_> = items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(links, vec!["https://x.test/keep", "https://x.test/late-utc"]);
    assert_eq!(stats.off_day, 2);
    let target = mining_news_digest::clock::target_date(run_now(), tz);
    assert!(items
        .iter()
        .all(|i| mining_news_digest::clock::is_target_day(i.published_at, target, tz)));
}

#[tokio::test]
async fn fallback_does_not_activate_when_items_exist() {
    let a = spec("Source A");
    let fb = spec("Fallback Feed");
    let fetcher = StubFetcher::default()
        .with(&a.url, Feed::Entries(vec![on_target("https://x.test/a", None)]))
        .with(&fb.url, Feed::Entries(vec![entry(
            "https://fb.test/0",
            "2024-03-06T08:00:00Z",
            None,
        )]));

    let cfg = test_cfg(vec![a], Some(fb));
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    assert!(!stats.fallback_used);
    assert!(items.iter().all(|i| !i.is_fallback));
}

#[tokio::test]
async fn fallback_failure_still_completes_the_run() {
    let a = spec("Source A");
    let fb = spec("Fallback Feed");
    let fetcher = StubFetcher::default()
        .with(&a.url, Feed::Entries(Vec::new()))
        .with(&fb.url, Feed::Fail);

    let cfg = test_cfg(vec![a], Some(fb));
    let (items, stats) = run_once(Arc::new(fetcher), &cfg, table(), run_now())
        .await
        .unwrap();

    assert!(items.is_empty());
    assert!(!stats.fallback_used);
    assert_eq!(stats.source_errors, 1);
}

#[test]
fn normalize_and_filter_is_reexported_for_embedders() {
    // keep the pure pipeline pieces callable without a runtime
    let tz: chrono_tz::Tz = "America/Bahia".parse().unwrap();
    let target = chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let (kept, rejected, off_day) =
        ingest::normalize_and_filter(vec![on_target("https://x.test/1", None)], "A", target, tz);
    assert_eq!((kept.len(), rejected, off_day), (1, 0, 0));
}
