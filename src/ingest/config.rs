// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSpec;

const ENV_PATH: &str = "DIGEST_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/digest.toml";

fn default_timezone() -> String {
    "America/Bahia".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (+mining-news-digest)".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_global_deadline_secs() -> u64 {
    60
}
fn default_fallback_limit() -> usize {
    10
}
fn default_output_path() -> PathBuf {
    PathBuf::from("resumo-mineracao.txt")
}
fn default_shortener_endpoint() -> String {
    "https://is.gd/create.php".to_string()
}
fn default_shortener_timeout_secs() -> u64 {
    5
}
fn default_shortener_concurrency() -> usize {
    4
}

/// Best-effort link shortening; off unless a config turns it on.
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenerConfig {
    #[serde(default)]
    pub enabled: bool,
    /// GET endpoint answering `?format=simple&url=<raw>` with a plain-text body.
    #[serde(default = "default_shortener_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_shortener_timeout_secs")]
    pub timeout_secs: u64,
    /// Worker cap so the remote endpoint is not hammered.
    #[serde(default = "default_shortener_concurrency")]
    pub concurrency: usize,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_shortener_endpoint(),
            timeout_secs: default_shortener_timeout_secs(),
            concurrency: default_shortener_concurrency(),
        }
    }
}

/// Full run configuration. Sources are static per run; their order here is
/// also the duplicate-resolution order in the merge step.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    /// IANA zone used to resolve "yesterday".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Whole-pipeline deadline; in-flight fetches past it count as failed.
    #[serde(default = "default_global_deadline_secs")]
    pub global_deadline_secs: u64,
    #[serde(default)]
    pub sources: Vec<FeedSpec>,
    /// High-volume feed used for the recency fallback.
    pub fallback_source: Option<FeedSpec>,
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default)]
    pub shortener: ShortenerConfig,
}

impl DigestConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let cfg: DigestConfig = toml::from_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load order: $DIGEST_CONFIG_PATH, then config/digest.toml, then the
    /// built-in seed.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("DIGEST_CONFIG_PATH points to non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default_seed())
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.sources.is_empty() {
            return Err(anyhow!("digest config has no sources"));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("unknown timezone {:?}", self.timezone))
    }

    /// Built-in seed: Google News searches for the mining vertical plus a few
    /// direct publisher feeds. Used when no config file is present.
    pub fn default_seed() -> Self {
        let query = urlencoding::encode("mineração OR \"setor mineral\" OR mining");
        let google_news = FeedSpec {
            name: "Google News".to_string(),
            url: format!("https://news.google.com/rss/search?q={query}&hl=pt-BR&gl=BR&ceid=BR:pt-419"),
        };

        Self {
            timezone: default_timezone(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            global_deadline_secs: default_global_deadline_secs(),
            sources: vec![
                google_news.clone(),
                FeedSpec {
                    name: "Mining.com".to_string(),
                    url: "https://www.mining.com/feed/".to_string(),
                },
                FeedSpec {
                    name: "Mining Weekly".to_string(),
                    url: "https://www.miningweekly.com/rss/latest".to_string(),
                },
            ],
            fallback_source: Some(google_news),
            fallback_limit: default_fallback_limit(),
            output_path: default_output_path(),
            shortener: ShortenerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_valid() {
        let cfg = DigestConfig::default_seed();
        cfg.validate().unwrap();
        assert!(cfg.fallback_source.is_some());
        assert!(!cfg.shortener.enabled);
    }

    #[test]
    fn minimal_toml_gets_defaults() {
        let cfg: DigestConfig = toml::from_str(
            r#"
[[sources]]
name = "A"
url = "https://a.test/rss"
"#,
        )
        .unwrap();
        assert_eq!(cfg.timezone, "America/Bahia");
        assert_eq!(cfg.fallback_limit, 10);
        assert!(cfg.fallback_source.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn bad_timezone_is_rejected() {
        let cfg: DigestConfig = toml::from_str(
            r#"
timezone = "America/Nowhere"
[[sources]]
name = "A"
url = "https://a.test/rss"
"#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }
}
