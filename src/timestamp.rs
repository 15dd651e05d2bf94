//! Timestamp normalization.
//!
//! Board data reaches us through several write paths, and each one stores
//! time its own way: a `{seconds, nanoseconds}` object, an ISO-8601 string,
//! epoch milliseconds, or nothing at all. Everything downstream of ingestion
//! works with `DateTime<Utc>` only; this module is the one place that deals
//! with the variety.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamp exactly as it appears in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Structured time object, e.g. `{"seconds": 1736150400, "nanoseconds": 0}`.
    Structured {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    /// Epoch milliseconds.
    Millis(f64),
    /// ISO-8601 text.
    Text(String),
    /// Anything else. Kept so a stray value never fails the whole snapshot.
    Unrecognized(serde_json::Value),
}

impl RawTimestamp {
    /// Convert to an instant, or `None` when the value cannot be interpreted.
    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Structured {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
            RawTimestamp::Millis(ms) => {
                if !ms.is_finite() {
                    return None;
                }
                DateTime::from_timestamp_millis(*ms as i64)
            }
            RawTimestamp::Text(s) => parse_iso(s),
            RawTimestamp::Unrecognized(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        RawTimestamp::Text(dt.to_rfc3339())
    }
}

/// Resolve a possibly-absent raw timestamp, or `None` if it is absent or unparsable.
pub fn try_normalize(raw: Option<&RawTimestamp>) -> Option<DateTime<Utc>> {
    raw.and_then(RawTimestamp::to_instant)
}

/// Resolve a possibly-absent raw timestamp, falling back to `default`.
///
/// Never fails: absent, malformed, or out-of-range input all yield `default`.
pub fn normalize(raw: Option<&RawTimestamp>, default: DateTime<Utc>) -> DateTime<Utc> {
    match try_normalize(raw) {
        Some(dt) => dt,
        None => {
            if raw.is_some() {
                log::debug!("Unparsable timestamp {raw:?}; using {default}");
            }
            default
        }
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive forms are taken as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
