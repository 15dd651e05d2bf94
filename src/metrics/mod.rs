pub mod burndown;
pub mod contributors;
pub mod cycle_time;
pub mod summary;
pub mod trend;
pub mod types;
pub mod velocity;

pub use types::*;

use chrono::{DateTime, Utc};

use crate::model::{SprintSnapshot, Task};
use crate::window::AnalysisWindow;

/// Compute every series for a sprint from one snapshot.
///
/// Pure: the same snapshot, window, and `now` always give the same report.
/// Manual overrides are taken from `snapshot.burndown_entries`; merge stored
/// ones in with [`crate::snapshot::merge_overrides`] before calling.
pub fn compute_sprint_report(
    snapshot: &SprintSnapshot,
    window: AnalysisWindow,
    now: DateTime<Utc>,
) -> SprintReport {
    let sprint = &snapshot.sprint;
    let tasks = &snapshot.tasks;

    let team_size = contributors::resolve_contributors(&snapshot.collaborators, tasks).len();
    let window_days = window.days(sprint, now);
    let (range_start, range_end) = window.date_range(sprint, now);

    let burndown = burndown::generate_burndown(sprint, tasks, &snapshot.burndown_entries, now);
    let velocity = velocity::aggregate_velocity(
        tasks,
        team_size,
        window_days,
        window.anchor(sprint, now),
    );
    let cycle_time = cycle_time::analyze_cycle_time(tasks);
    let contributors =
        contributors::aggregate_contributors(&snapshot.collaborators, tasks, window_days);
    let completion_trend = trend::completion_trend(tasks, range_start, range_end);
    let summary = summary::summarize(
        sprint,
        tasks,
        &velocity,
        &contributors,
        cycle_time.stats.avg_days,
        now,
    );

    log::info!(
        "Computed report for {} ({} tasks, window {window})",
        sprint.key(),
        tasks.len()
    );

    SprintReport {
        sprint_key: sprint.key(),
        generated_at: now,
        window: window.to_key(),
        burndown,
        velocity,
        cycle_time,
        contributors,
        completion_trend,
        summary,
    }
}

/// Sum of resolved points over all tasks.
pub fn total_points(tasks: &[Task]) -> i64 {
    tasks.iter().map(Task::points).sum()
}

/// Sum of resolved points over done tasks.
pub fn completed_points(tasks: &[Task]) -> i64 {
    tasks.iter().filter(|t| t.is_done()).map(Task::points).sum()
}

/// NaN and infinities become 0.
pub fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// `num / den * 100`, or 0 when `den` is 0.
pub(crate) fn percentage(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    finite_or_zero(num / den * 100.0)
}

/// Arithmetic mean, or 0 for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(values.iter().sum::<f64>() / values.len() as f64)
}
