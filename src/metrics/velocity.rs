use chrono::{DateTime, Duration, Utc};

use crate::metrics::types::VelocityBucket;
use crate::metrics::{finite_or_zero, percentage};
use crate::model::Task;

/// Planning capacity of one person for one week, in points.
pub const POINTS_PER_PERSON_PER_WEEK: i64 = 40;

/// Velocity never looks back more than this many weeks.
pub const MAX_BUCKETS: usize = 8;

/// Number of weekly buckets for a window of `window_days` days.
pub fn bucket_count(window_days: i64) -> usize {
    let weeks = (window_days.max(1) + 6) / 7;
    (weeks as usize).clamp(1, MAX_BUCKETS)
}

/// Completed points per trailing week, oldest week first.
///
/// Bucket `i` (0 = most recent) covers `[anchor - 7(i+1) days, anchor - 7i days)`.
/// A team size of 0 is treated as 1 so capacity is never zero.
pub fn aggregate_velocity(
    tasks: &[Task],
    team_size: usize,
    window_days: i64,
    anchor: DateTime<Utc>,
) -> Vec<VelocityBucket> {
    let capacity = team_size.max(1) as i64 * POINTS_PER_PERSON_PER_WEEK;
    let completions: Vec<(DateTime<Utc>, i64)> = tasks
        .iter()
        .filter_map(|t| t.completed_at().map(|at| (at, t.points())))
        .collect();

    let mut buckets = Vec::new();
    let mut previous: Option<i64> = None;
    for i in (0..bucket_count(window_days) as i64).rev() {
        let bounds = anchor
            .checked_sub_signed(Duration::days(7 * i))
            .and_then(|end| Some((end.checked_sub_signed(Duration::days(7))?, end)));
        let Some((start, end)) = bounds else {
            log::debug!("Skipping velocity bucket {i}: before the calendar range");
            continue;
        };
        let completed: i64 = completions
            .iter()
            .filter(|(at, _)| *at >= start && *at < end)
            .map(|(_, pts)| pts)
            .sum();
        let completed = completed.max(0);

        buckets.push(VelocityBucket {
            label: start.format("%b %d").to_string(),
            start: start.date_naive(),
            end: end.date_naive(),
            completed,
            capacity,
            utilization: finite_or_zero(percentage(completed as f64, capacity as f64)),
            trend: previous.map_or(0, |p| completed - p),
        });
        previous = Some(completed);
    }
    buckets
}
