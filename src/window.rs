use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

use crate::date_util::span_days;
use crate::error::{Error, Result};
use crate::model::SprintConfig;

static RE_ROLLING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,4})\s*(?:d|days?)$").unwrap());

/// The trailing time window that velocity and contributor metrics look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisWindow {
    /// The last N days up to and including today.
    Rolling(u32),
    /// The sprint's own date range.
    Sprint,
}

impl Default for AnalysisWindow {
    fn default() -> Self {
        AnalysisWindow::Rolling(30)
    }
}

impl AnalysisWindow {
    /// Parse a window string.
    ///
    /// Supported formats:
    /// - `7d`, `30d`, `90d` (any `Nd` with N >= 1; `30days` also accepted)
    /// - `sprint`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        if s == "sprint" {
            return Ok(AnalysisWindow::Sprint);
        }
        if let Some(caps) = RE_ROLLING.captures(&s) {
            let n: u32 = caps[1]
                .parse()
                .map_err(|_| Error::WindowParse(format!("invalid day count: {s}")))?;
            if n == 0 {
                return Err(Error::WindowParse("window must cover at least one day".into()));
            }
            return Ok(AnalysisWindow::Rolling(n));
        }
        Err(Error::WindowParse(format!("unrecognized window: {s}")))
    }

    /// Canonical key string, the inverse of [`AnalysisWindow::parse`].
    pub fn to_key(&self) -> String {
        match self {
            AnalysisWindow::Rolling(n) => format!("{n}d"),
            AnalysisWindow::Sprint => "sprint".to_string(),
        }
    }

    /// Inclusive date range covered by the window.
    pub fn date_range(&self, sprint: &SprintConfig, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let today = now.date_naive();
        match self {
            AnalysisWindow::Rolling(n) => {
                let start = today
                    .checked_sub_signed(Duration::days(*n as i64 - 1))
                    .unwrap_or(NaiveDate::MIN);
                (start, today)
            }
            AnalysisWindow::Sprint => (sprint.start_date, sprint.end_date),
        }
    }

    /// Length of the window in days (at least 1).
    pub fn days(&self, sprint: &SprintConfig, now: DateTime<Utc>) -> i64 {
        let (start, end) = self.date_range(sprint, now);
        span_days(start, end).max(1)
    }

    /// Instant the trailing buckets are measured back from.
    ///
    /// Rolling windows end now; a sprint window ends at the sprint's last
    /// day, or now if the sprint is still running or ends on the last
    /// representable date.
    pub fn anchor(&self, sprint: &SprintConfig, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            AnalysisWindow::Rolling(_) => now,
            AnalysisWindow::Sprint => {
                let after_end = sprint
                    .end_date
                    .succ_opt()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|ndt| ndt.and_utc());
                match after_end {
                    Some(end) if end < now => end,
                    _ => now,
                }
            }
        }
    }
}

impl std::fmt::Display for AnalysisWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}
