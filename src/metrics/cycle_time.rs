use crate::date_util::ceil_days;
use crate::events::{marker_instant, Marker};
use crate::metrics::finite_or_zero;
use crate::metrics::types::{CycleTimeBucket, CycleTimeReport, CycleTimeStats, TaskCycleTime};
use crate::model::Task;

/// Distribution bucket labels with their inclusive upper bound in days.
const BUCKETS: &[(&str, Option<i64>)] = &[
    ("≤1 day", Some(1)),
    ("2-3 days", Some(3)),
    ("4-7 days", Some(7)),
    ("1-2 weeks", Some(14)),
    (">2 weeks", None),
];

/// Whole days from the first "entered in-progress" event to the first
/// "entered done" event, rounded up and clamped at zero.
///
/// `None` for tasks that are not done or lack either marker.
pub fn task_cycle_time(task: &Task) -> Option<i64> {
    if !task.is_done() {
        return None;
    }
    let started = task.started_at()?;
    let done = marker_instant(&task.progress_log, Marker::EnteredDone)?;
    Some(ceil_days(done - started).max(0))
}

/// Cycle times of every measurable task, in input order.
pub fn cycle_times(tasks: &[Task]) -> Vec<TaskCycleTime> {
    tasks
        .iter()
        .filter_map(|t| {
            task_cycle_time(t).map(|days| TaskCycleTime {
                task_id: t.id.clone(),
                days,
            })
        })
        .collect()
}

/// Mean cycle time in days, 0 when nothing is measurable.
pub fn average_cycle_time(tasks: &[Task]) -> f64 {
    let days: Vec<i64> = tasks.iter().filter_map(task_cycle_time).collect();
    mean_days(&days)
}

/// Counts per cycle-time bucket. All buckets are always present.
pub fn distribution(days: &[i64]) -> Vec<CycleTimeBucket> {
    let total = days.len();
    let mut counts = vec![0u64; BUCKETS.len()];
    for &d in days {
        let idx = BUCKETS
            .iter()
            .position(|(_, max)| max.map_or(true, |m| d <= m))
            .unwrap_or(BUCKETS.len() - 1);
        counts[idx] += 1;
    }
    BUCKETS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| CycleTimeBucket {
            bucket: label.to_string(),
            count,
            percentage: if total > 0 {
                (count as f64 / total as f64 * 100.0).round() as u32
            } else {
                0
            },
        })
        .collect()
}

/// Per-task cycle times, summary statistics, and the bucketed distribution.
pub fn analyze_cycle_time(tasks: &[Task]) -> CycleTimeReport {
    let per_task = cycle_times(tasks);
    let days: Vec<i64> = per_task.iter().map(|c| c.days).collect();
    CycleTimeReport {
        stats: stats_from_days(&days),
        distribution: distribution(&days),
        per_task,
    }
}

fn mean_days(days: &[i64]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    finite_or_zero(days.iter().sum::<i64>() as f64 / days.len() as f64)
}

fn stats_from_days(days: &[i64]) -> CycleTimeStats {
    if days.is_empty() {
        return CycleTimeStats::default();
    }
    let mut sorted = days.to_vec();
    sorted.sort_unstable();

    #[allow(clippy::manual_is_multiple_of)]
    let median = if sorted.len() % 2 == 0 {
        let mid = sorted.len() / 2;
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[sorted.len() / 2] as f64
    };

    let p90_idx = ((sorted.len() as f64) * 0.9).ceil() as usize;
    let p90_idx = p90_idx.min(sorted.len()).max(1) - 1;

    CycleTimeStats {
        tasks_measured: sorted.len() as u64,
        avg_days: mean_days(&sorted),
        median_days: Some(median),
        p90_days: Some(sorted[p90_idx] as f64),
        min_days: sorted.first().copied(),
        max_days: sorted.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Priority, ProgressEvent, TaskStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    fn status(desc: &str, at: DateTime<Utc>) -> ProgressEvent {
        ProgressEvent {
            kind: EventKind::StatusChange,
            description: desc.into(),
            timestamp: at,
            user: None,
        }
    }

    fn task_with_log(log: Vec<ProgressEvent>) -> Task {
        Task {
            id: "t".into(),
            title: None,
            points: Some(3),
            priority: Priority::Low,
            status: TaskStatus::Done,
            assigned_to: None,
            created_at: t0(),
            progress_log: log,
        }
    }

    fn cycled(hours: i64) -> Task {
        task_with_log(vec![
            status("Moved to In Progress", t0()),
            status("Moved to Done", t0() + Duration::hours(hours)),
        ])
    }

    #[test]
    fn test_cycle_time_rounds_up() {
        assert_eq!(task_cycle_time(&cycled(0)), Some(0));
        assert_eq!(task_cycle_time(&cycled(2)), Some(1));
        assert_eq!(task_cycle_time(&cycled(24)), Some(1));
        assert_eq!(task_cycle_time(&cycled(49)), Some(3));
    }

    #[test]
    fn test_out_of_order_clamped_to_zero() {
        let t = task_with_log(vec![
            status("Moved to Done", t0()),
            status("Moved to In Progress", t0() + Duration::days(3)),
        ]);
        assert_eq!(task_cycle_time(&t), Some(0));
    }

    #[test]
    fn test_reopened_uses_first_done() {
        let t = task_with_log(vec![
            status("Moved to In Progress", t0()),
            status("Moved to Done", t0() + Duration::days(2)),
            status("Moved to In Progress", t0() + Duration::days(4)),
            status("Moved to Done", t0() + Duration::days(10)),
        ]);
        assert_eq!(task_cycle_time(&t), Some(2));
    }

    #[test]
    fn test_missing_markers_excluded() {
        let no_start = task_with_log(vec![status("Moved to Done", t0())]);
        let no_done = task_with_log(vec![status("Moved to In Progress", t0())]);
        assert_eq!(task_cycle_time(&no_start), None);
        assert_eq!(task_cycle_time(&no_done), None);

        let mut open = cycled(30);
        open.status = TaskStatus::InProgress;
        assert_eq!(task_cycle_time(&open), None);

        let tasks = vec![no_start, cycled(48), no_done, cycled(96)];
        assert_eq!(average_cycle_time(&tasks), 3.0);
        assert_eq!(cycle_times(&tasks).len(), 2);
    }

    #[test]
    fn test_average_empty_is_zero() {
        assert_eq!(average_cycle_time(&[]), 0.0);
    }

    #[test]
    fn test_distribution_buckets() {
        let dist = distribution(&[0, 1, 2, 3, 5, 7, 8, 14, 15, 30]);
        let counts: Vec<u64> = dist.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2, 2, 2, 2]);
        assert!(dist.iter().all(|b| b.percentage == 20));
        assert_eq!(dist[0].bucket, "≤1 day");
        assert_eq!(dist[4].bucket, ">2 weeks");
    }

    #[test]
    fn test_distribution_rounding() {
        let dist = distribution(&[1, 2, 2]);
        assert_eq!(dist[0].percentage, 33);
        assert_eq!(dist[1].percentage, 67);
    }

    #[test]
    fn test_distribution_empty() {
        let dist = distribution(&[]);
        assert_eq!(dist.len(), 5);
        assert!(dist.iter().all(|b| b.count == 0 && b.percentage == 0));
    }

    #[test]
    fn test_stats_single_element() {
        let s = stats_from_days(&[5]);
        assert_eq!(s.avg_days, 5.0);
        assert_eq!(s.median_days, Some(5.0));
        assert_eq!(s.p90_days, Some(5.0));
        assert_eq!(s.min_days, Some(5));
        assert_eq!(s.max_days, Some(5));
    }

    #[test]
    fn test_stats_many_elements() {
        let days: Vec<i64> = (1..=100).rev().collect();
        let s = stats_from_days(&days);
        assert_eq!(s.tasks_measured, 100);
        assert_eq!(s.avg_days, 50.5);
        assert_eq!(s.median_days, Some(50.5));
        assert_eq!(s.p90_days, Some(90.0));
        assert_eq!(s.min_days, Some(1));
        assert_eq!(s.max_days, Some(100));
    }

    #[test]
    fn test_stats_empty() {
        let s = stats_from_days(&[]);
        assert_eq!(s.tasks_measured, 0);
        assert!(s.median_days.is_none());
    }
}
