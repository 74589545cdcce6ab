// src/clock.rs
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// Calendar date immediately preceding `now` as seen in `tz`.
///
/// Uses the IANA database via `chrono-tz`, so DST transitions resolve the way
/// a wall clock in that zone would, not via a fixed offset.
pub fn target_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    let local = now.with_timezone(&tz).date_naive();
    local.pred_opt().unwrap_or(local)
}

/// True when `published_at`, converted to `tz`, falls on `date`.
/// Applied identically to every source.
pub fn is_target_day(published_at: DateTime<Utc>, date: NaiveDate, tz: Tz) -> bool {
    published_at.with_timezone(&tz).date_naive() == date
}

/// Target date rendered for the prompt and the artifact header (dd/mm/yyyy).
pub fn format_date_br(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}
