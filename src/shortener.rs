// src/shortener.rs
//
// Best-effort link shortening. Any failure — timeout, non-2xx, junk body —
// leaves the original link untouched and logs a warning. Nothing here may
// abort or delay the rest of the pipeline beyond its own timeout.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::ingest::config::ShortenerConfig;
use crate::ingest::types::NewsItem;

pub struct LinkShortener {
    client: reqwest::Client,
    endpoint: String,
    concurrency: usize,
}

/// A plain-text shortener answer must look like a URL; error pages sometimes
/// come back with a 200.
fn clean_short_url(body: &str) -> Option<String> {
    let s = body.trim();
    if s.is_empty() || !s.starts_with("http") || s.contains(char::is_whitespace) {
        return None;
    }
    Some(s.to_string())
}

impl LinkShortener {
    pub fn new(cfg: &ShortenerConfig, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building shortener http client")?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            concurrency: cfg.concurrency.max(1),
        })
    }

    /// Shorten one URL; returns the original on any failure.
    pub async fn shorten(&self, url: &str) -> String {
        let request_url = format!(
            "{}?format=simple&url={}",
            self.endpoint,
            urlencoding::encode(url)
        );
        let attempt = async {
            let resp = self
                .client
                .get(&request_url)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, reqwest::Error>(resp.text().await?)
        };
        match attempt.await {
            Ok(body) => match clean_short_url(&body) {
                Some(short) => short,
                None => {
                    warn!(url, "shortener returned a non-url body");
                    url.to_string()
                }
            },
            Err(e) => {
                warn!(url, error = ?e, "shortener request failed");
                url.to_string()
            }
        }
    }

    /// Rewrite every item's link in place, with a bounded worker pool.
    /// Item count and order are never changed.
    pub async fn shorten_all(&self, items: &mut [NewsItem]) {
        let shortened: Vec<(usize, String)> = stream::iter(
            items
                .iter()
                .enumerate()
                .map(|(i, it)| {
                    let link = it.link.clone();
                    async move { (i, self.shorten(&link).await) }
                })
                .collect::<Vec<_>>(),
        )
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        for (i, short) in shortened {
            items[i].link = short;
        }
    }
}
