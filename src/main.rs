//! Mining News Digest — Binary Entrypoint
//! One invocation = one pipeline run: fetch, filter to yesterday, dedup,
//! score, summarize, write a single text artifact.

use std::sync::Arc;
use std::time::Duration;

use mining_news_digest::ingest::config::DigestConfig;
use mining_news_digest::ingest::feed::HttpFeedFetcher;
use mining_news_digest::ingest::types::FeedFetcher;
use mining_news_digest::reliability::ReliabilityTable;
use mining_news_digest::shortener::LinkShortener;
use mining_news_digest::summarize::{self, Summarizer};
use mining_news_digest::{clock, ingest, report};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const RELIABILITY_CONFIG_PATH: &str = "config/reliability.json";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mining_news_digest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local runs; no-op elsewhere.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Fatal configuration checks come before any network I/O.
    let api_key = summarize::api_key_from_env()?;
    let cfg = DigestConfig::load_default()?;
    let tz = cfg.tz()?;
    let table = Arc::new(ReliabilityTable::load_from_file(RELIABILITY_CONFIG_PATH));

    let now = chrono::Utc::now();
    let target = clock::target_date(now, tz);
    let date_br = clock::format_date_br(target);
    tracing::info!(target_date = %target, sources = cfg.sources.len(), "starting run");

    let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFeedFetcher::new(
        &cfg.user_agent,
        Duration::from_secs(cfg.fetch_timeout_secs),
    )?);

    let (mut items, stats) = ingest::run_once(fetcher, &cfg, table, now).await?;
    tracing::info!(
        kept = stats.kept,
        rejected = stats.rejected,
        off_day = stats.off_day,
        deduped = stats.deduped,
        source_errors = stats.source_errors,
        fallback = stats.fallback_used,
        "ingest finished"
    );

    if cfg.shortener.enabled && !items.is_empty() {
        let shortener = LinkShortener::new(&cfg.shortener, &cfg.user_agent)?;
        shortener.shorten_all(&mut items).await;
    }

    let body = if items.is_empty() {
        report::no_news_notice(&date_br)
    } else {
        let headlines = report::headline_block(&items);
        let summarizer = Summarizer::new(api_key, &cfg.user_agent)?;
        match summarizer.summarize(&headlines, &date_br).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = ?e, "synthesis failed, writing notice instead");
                report::failure_notice(&e)
            }
        }
    };

    let generated_at = now.with_timezone(&tz).format("%d/%m/%Y %H:%M").to_string();
    let artifact = report::render_artifact(&body, &date_br, &generated_at, stats.fallback_used);
    report::write_artifact(&cfg.output_path, &artifact)?;
    tracing::info!(path = %cfg.output_path.display(), "artifact written");

    Ok(())
}
