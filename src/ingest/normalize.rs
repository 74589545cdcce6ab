// src/ingest/normalize.rs
use chrono::{DateTime, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{NewsItem, RawEntry};

/// Fallback publisher name when neither the entry nor the feed supplies one.
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// Summaries longer than this are cut; feeds routinely ship whole paragraphs.
const SUMMARY_CAP: usize = 500;

/// Strip tags/entities and collapse whitespace. Titles and summaries arrive
/// with embedded HTML from several publishers.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// RSS `pubDate` is RFC 2822; Atom timestamps are RFC 3339. Feeds are not
/// strict about which, so try both. Returned instants are UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = OffsetDateTime::parse(ts.trim(), &Rfc2822) {
        let unix = dt.to_offset(UtcOffset::UTC).unix_timestamp();
        return DateTime::<Utc>::from_timestamp(unix, 0);
    }
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Turn one raw entry into a `NewsItem`, or reject it.
///
/// Rules, in order:
/// 1. link required — empty or missing rejects the entry;
/// 2. timestamp: `published` first, then `updated`; neither parsing rejects;
/// 3. title trimmed, empty tolerated;
/// 4. source: nested entry source, else `source_hint`, else "unknown source".
///
/// Reliability is assigned later by the scorer; 0 here is a placeholder.
pub fn normalize(raw: &RawEntry, source_hint: &str) -> Option<NewsItem> {
    let link = raw.link.as_deref().map(str::trim).unwrap_or_default();
    if link.is_empty() {
        return None;
    }

    let published_at = raw
        .published
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| raw.updated.as_deref().and_then(parse_timestamp))?;

    let source = raw
        .source_title
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            let hint = source_hint.trim();
            (!hint.is_empty()).then(|| hint.to_string())
        })
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

    let title = raw.title.as_deref().map(clean_text).unwrap_or_default();

    let summary = raw
        .summary
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .map(|mut s| {
            if s.chars().count() > SUMMARY_CAP {
                s = s.chars().take(SUMMARY_CAP).collect();
            }
            s
        });

    Some(NewsItem {
        title,
        link: link.to_string(),
        source,
        published_at,
        reliability: 0,
        summary,
        is_fallback: false,
    })
}
