// src/ingest/mod.rs
pub mod config;
pub mod feed;
pub mod normalize;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

use crate::clock;
use crate::ingest::config::DigestConfig;
use crate::ingest::types::{FeedFetcher, NewsItem, RawEntry};
use crate::reliability::ReliabilityTable;

/// One-time metrics registration (so series have descriptions wherever a
/// recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_entries_total", "Raw entries parsed from feeds.");
        describe_counter!(
            "digest_kept_total",
            "Items kept after normalization + date filtering."
        );
        describe_counter!(
            "digest_rejected_total",
            "Entries rejected for missing link/timestamp."
        );
        describe_counter!(
            "digest_off_day_total",
            "Normalized entries outside the target date."
        );
        describe_counter!("digest_dedup_total", "Items dropped as duplicate links.");
        describe_counter!("digest_source_errors_total", "Source fetch/parse errors.");
        describe_counter!("digest_fallback_runs_total", "Runs that used the fallback.");
        describe_histogram!("digest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("digest_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Per-run observability counts. All failure modes recorded here are
/// recoverable; none aborts the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub entries: usize,
    pub kept: usize,
    pub rejected: usize,
    pub off_day: usize,
    pub deduped: usize,
    pub source_errors: usize,
    pub fallback_used: bool,
}

/// Normalize one source's raw entries and keep those on the target date.
/// Returns (kept, rejected, off_day).
pub fn normalize_and_filter(
    raw: Vec<RawEntry>,
    source_hint: &str,
    target: NaiveDate,
    tz: Tz,
) -> (Vec<NewsItem>, usize, usize) {
    let mut kept = Vec::with_capacity(raw.len());
    let mut rejected = 0usize;
    let mut off_day = 0usize;

    for entry in &raw {
        let Some(item) = normalize::normalize(entry, source_hint) else {
            rejected += 1;
            continue;
        };
        if !clock::is_target_day(item.published_at, target, tz) {
            off_day += 1;
            continue;
        }
        kept.push(item);
    }

    (kept, rejected, off_day)
}

/// Merge per-source lists, collapsing duplicate links.
///
/// Lists are visited in the given (configured) order, so the first source
/// wins a duplicate regardless of which fetch finished first. The seen-set
/// lives only here; no fetch task ever touches it. The result is sorted
/// ascending by `published_at` (stable, so ties keep first-seen order).
pub fn merge_items(per_source: Vec<Vec<NewsItem>>) -> (Vec<NewsItem>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    let mut deduped = 0usize;

    for list in per_source {
        for item in list {
            if seen.insert(item.link.clone()) {
                merged.push(item);
            } else {
                deduped += 1;
            }
        }
    }

    merged.sort_by_key(|it| it.published_at);
    (merged, deduped)
}

fn score_items(items: &mut [NewsItem], table: &ReliabilityTable) {
    for it in items.iter_mut() {
        it.reliability = table.score_for(&it.source);
    }
}

/// Recency fallback: newest entries of the designated source, no date filter,
/// capped at `limit`, every item tagged.
pub async fn fetch_fallback(
    fetcher: &dyn FeedFetcher,
    spec: &types::FeedSpec,
    limit: usize,
    table: &ReliabilityTable,
) -> Result<Vec<NewsItem>> {
    let raw = fetcher.fetch(&spec.url).await?;
    let mut items: Vec<NewsItem> = raw
        .iter()
        .filter_map(|e| normalize::normalize(e, &spec.name))
        .take(limit)
        .map(|mut it| {
            it.is_fallback = true;
            it
        })
        .collect();
    score_items(&mut items, table);
    Ok(items)
}

/// Run the whole pipeline once: fetch every configured source concurrently,
/// normalize, date-filter and score per source, then merge in configured
/// order; fall back to the default source when nothing survives the filter.
pub async fn run_once(
    fetcher: Arc<dyn FeedFetcher>,
    cfg: &DigestConfig,
    table: Arc<ReliabilityTable>,
    now: DateTime<Utc>,
) -> Result<(Vec<NewsItem>, IngestStats)> {
    ensure_metrics_described();

    let tz = cfg.tz()?;
    let target = clock::target_date(now, tz);
    let per_source_timeout = Duration::from_secs(cfg.fetch_timeout_secs);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(cfg.global_deadline_secs);

    let mut stats = IngestStats::default();

    // One task per source; each owns its fetch + normalize + filter + score.
    // Nothing is shared between tasks except the fetcher and score table.
    let mut handles = Vec::with_capacity(cfg.sources.len());
    for spec in cfg.sources.clone() {
        let fetcher = Arc::clone(&fetcher);
        let table = Arc::clone(&table);
        handles.push(tokio::spawn(async move {
            let raw = tokio::time::timeout(per_source_timeout, fetcher.fetch(&spec.url))
                .await
                .map_err(|_| anyhow!("source {:?} timed out", spec.name))??;
            let entries = raw.len();
            let (mut kept, rejected, off_day) =
                normalize_and_filter(raw, &spec.name, target, tz);
            score_items(&mut kept, &table);
            Ok::<_, anyhow::Error>((spec.name, entries, kept, rejected, off_day))
        }));
    }

    // Buffer results in configured order so duplicate resolution never
    // depends on completion order. The shared deadline cancels stragglers.
    let mut per_source: Vec<Vec<NewsItem>> = Vec::with_capacity(handles.len());
    for (idx, mut handle) in handles.into_iter().enumerate() {
        let joined = match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => joined.map_err(|e| anyhow!("source task panicked: {e}")),
            Err(_) => {
                handle.abort();
                Ok(Err(anyhow!("global deadline exceeded")))
            }
        };
        match joined.and_then(|r| r) {
            Ok((name, entries, kept, rejected, off_day)) => {
                tracing::debug!(
                    source = %name,
                    entries,
                    kept = kept.len(),
                    rejected,
                    off_day,
                    "source done"
                );
                stats.entries += entries;
                stats.rejected += rejected;
                stats.off_day += off_day;
                per_source.push(kept);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source_index = idx, "source failed");
                counter!("digest_source_errors_total").increment(1);
                stats.source_errors += 1;
                per_source.push(Vec::new());
            }
        }
    }

    let (mut items, deduped) = merge_items(per_source);
    stats.deduped = deduped;

    if items.is_empty() {
        if let Some(spec) = &cfg.fallback_source {
            tracing::info!(source = %spec.name, "no items on target date, using fallback");
            counter!("digest_fallback_runs_total").increment(1);
            match fetch_fallback(fetcher.as_ref(), spec, cfg.fallback_limit, &table).await {
                Ok(fb) => {
                    stats.fallback_used = true;
                    items = fb;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "fallback fetch failed");
                    counter!("digest_source_errors_total").increment(1);
                    stats.source_errors += 1;
                }
            }
        }
    }

    stats.kept = items.len();
    counter!("digest_kept_total").increment(stats.kept as u64);
    counter!("digest_rejected_total").increment(stats.rejected as u64);
    counter!("digest_off_day_total").increment(stats.off_day as u64);
    counter!("digest_dedup_total").increment(stats.deduped as u64);
    gauge!("digest_last_run_ts").set(now.timestamp().max(0) as f64);

    Ok((items, stats))
}
