use chrono::{Duration, NaiveDate};

use crate::error::{Error, Result};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Iterate every calendar date in `[start, end]`, inclusive on both ends.
/// Yields nothing when `start > end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Number of calendar days in `[start, end]`, or 0 for an inverted range.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(0)
}

/// Round a duration up to whole days. Negative durations round toward zero.
pub fn ceil_days(d: Duration) -> i64 {
    let ms = d.num_milliseconds();
    if ms <= 0 {
        return ms / MILLIS_PER_DAY;
    }
    (ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Canonical `YYYY-MM-DD` key for a date.
pub fn date_key(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` key.
pub fn parse_date_key(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(format!("expected YYYY-MM-DD, got {s}")))
}
