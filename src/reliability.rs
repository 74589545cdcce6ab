//! # Reliability Scorer
//!
//! Static mapping from publisher names to a trust score on a single fixed
//! scale: integers `0..=10`. Unknown sources get `DEFAULT_SCORE` (5) — never
//! the maximum, so "unverified" cannot read as "highly trusted".
//!
//! Lookup is a case-sensitive exact match on the resolved source name; no
//! aliasing or fuzzy matching. Scores can be overridden from a JSON config
//! file; the built-in seed covers the publishers the seeded feeds attribute
//! items to.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

/// Inclusive score bounds.
pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 10;
/// Assigned to any source not present in the table.
pub const DEFAULT_SCORE: u8 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct ReliabilityTable {
    #[serde(default = "default_default_score")]
    pub default_score: u8,
    #[serde(default)]
    pub scores: HashMap<String, u8>,
}

fn default_default_score() -> u8 {
    DEFAULT_SCORE
}

impl ReliabilityTable {
    /// Load from a JSON file; falls back to `default_seed()` on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Score for a resolved source name. Exact match or the default, clamped
    /// to the scale either way.
    pub fn score_for(&self, source: &str) -> u8 {
        let raw = self
            .scores
            .get(source)
            .copied()
            .unwrap_or(self.default_score);
        raw.min(MAX_SCORE)
    }

    /// Built-in seed for the mining vertical.
    pub(crate) fn default_seed() -> Self {
        let mut scores = HashMap::new();
        for (k, v) in [
            ("Reuters", 9),
            ("Bloomberg", 9),
            ("Financial Times", 9),
            ("Valor Econômico", 8),
            ("Mining.com", 8),
            ("MINING.COM", 8),
            ("Mining Weekly", 8),
            ("Mining Journal", 8),
            ("S&P Global", 8),
            ("Agência Brasil", 7),
            ("Brasil Mineral", 7),
            ("Notícias de Mineração Brasil", 7),
            ("Kitco News", 6),
            ("The Assay", 6),
            ("Google News", 6),
        ] {
            scores.insert(k.to_string(), v);
        }
        Self {
            default_score: DEFAULT_SCORE,
            scores,
        }
    }
}

impl Default for ReliabilityTable {
    fn default() -> Self {
        Self::default_seed()
    }
}
