use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::{ideal_remaining, total_working_days, working_days_elapsed};
use crate::date_util::days_inclusive;
use crate::metrics::types::BurndownPoint;
use crate::metrics::{finite_or_zero, total_points};
use crate::model::{BurndownEntry, SprintConfig, Task};

/// Build the per-day ideal/actual burndown for the sprint.
///
/// For each date in the sprint, in order of precedence:
/// 1. a manual override for that date is used as-is;
/// 2. on or before today, completed points are summed from done tasks whose
///    completion date is on or before the date;
/// 3. future dates project the ideal line.
///
/// Overrides are isolated points: they do not move the ideal line or the
/// computed values of other days. The sprint total always comes from the
/// live task set; `sprint.total_points` is ignored.
pub fn generate_burndown(
    sprint: &SprintConfig,
    tasks: &[Task],
    overrides: &[BurndownEntry],
    now: DateTime<Utc>,
) -> Vec<BurndownPoint> {
    let today = now.date_naive();
    let total = total_points(tasks);
    let total_wd = total_working_days(sprint.start_date, sprint.end_date, sprint.working_days);

    let by_date: HashMap<NaiveDate, &BurndownEntry> =
        overrides.iter().map(|e| (e.date, e)).collect();
    let mut applied = 0usize;

    let completions: Vec<(NaiveDate, i64)> = tasks
        .iter()
        .filter_map(|t| t.completed_at().map(|at| (at.date_naive(), t.points())))
        .collect();

    let series: Vec<BurndownPoint> = days_inclusive(sprint.start_date, sprint.end_date)
        .map(|date| {
            let elapsed = working_days_elapsed(sprint.start_date, date, sprint.working_days);
            let ideal = ideal_remaining(total as f64, elapsed, total_wd);
            let is_working_day = sprint.working_days.is_working_day(date);
            let is_today = date == today;

            if let Some(entry) = by_date.get(&date) {
                applied += 1;
                return BurndownPoint {
                    date,
                    ideal_remaining: ideal,
                    actual_remaining: entry.remaining_points as f64,
                    completed_points: Some(entry.completed_points),
                    is_today,
                    is_working_day,
                    is_manual: true,
                    is_projected: false,
                    note: entry.note.clone(),
                };
            }

            if date <= today {
                let completed: i64 = completions
                    .iter()
                    .filter(|(done, _)| *done <= date)
                    .map(|(_, pts)| pts)
                    .sum();
                BurndownPoint {
                    date,
                    ideal_remaining: ideal,
                    actual_remaining: (total - completed).max(0) as f64,
                    completed_points: Some(completed),
                    is_today,
                    is_working_day,
                    is_manual: false,
                    is_projected: false,
                    note: None,
                }
            } else {
                BurndownPoint {
                    date,
                    ideal_remaining: ideal,
                    actual_remaining: finite_or_zero(ideal),
                    completed_points: None,
                    is_today,
                    is_working_day,
                    is_manual: false,
                    is_projected: true,
                    note: None,
                }
            }
        })
        .collect();

    log::debug!(
        "Burndown for {}: {} days, {total} points, {applied} manual overrides",
        sprint.key(),
        series.len()
    );
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WorkingDays;
    use crate::model::{EventKind, Priority, ProgressEvent, TaskStatus};
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 15, 0, 0).unwrap()
    }

    fn sprint(start: NaiveDate, end: NaiveDate, working_days: WorkingDays) -> SprintConfig {
        SprintConfig {
            id: Some("s".into()),
            start_date: start,
            end_date: end,
            total_points: 999,
            working_days,
            sprint_goal: None,
            velocity_target: None,
        }
    }

    fn task(id: &str, points: i64, done_day: Option<u32>) -> Task {
        let mut log = vec![];
        let status = match done_day {
            Some(day) => {
                log.push(ProgressEvent {
                    kind: EventKind::StatusChange,
                    description: "Moved to Done".into(),
                    timestamp: at(day),
                    user: None,
                });
                TaskStatus::Done
            }
            None => TaskStatus::Todo,
        };
        Task {
            id: id.into(),
            title: None,
            points: Some(points),
            priority: Priority::Low,
            status,
            assigned_to: None,
            created_at: at(1),
            progress_log: log,
        }
    }

    #[test]
    fn test_ideal_halfway_on_fifth_working_day() {
        // 10-day sprint, every day a working day, 50 points
        let s = sprint(d(2025, 1, 1), d(2025, 1, 10), WorkingDays::EVERY_DAY);
        let tasks: Vec<Task> = (0..5).map(|i| task(&format!("t{i}"), 10, None)).collect();
        let series = generate_burndown(&s, &tasks, &[], at(1));
        assert_eq!(series.len(), 10);
        assert_eq!(series[4].ideal_remaining, 25.0);
        assert_eq!(series[9].ideal_remaining, 0.0);
    }

    #[test]
    fn test_ideal_non_increasing_and_flat_on_weekends() {
        // Mon 6th through Sun 19th
        let s = sprint(d(2025, 1, 6), d(2025, 1, 19), WorkingDays::WEEKDAYS);
        let tasks = vec![task("a", 20, None), task("b", 20, None)];
        let series = generate_burndown(&s, &tasks, &[], at(6));
        for w in series.windows(2) {
            assert!(w[1].ideal_remaining <= w[0].ideal_remaining);
            if !w[1].is_working_day {
                assert_eq!(w[1].ideal_remaining, w[0].ideal_remaining);
            }
        }
        assert!(!series[5].is_working_day);
    }

    #[test]
    fn test_actual_from_completion_dates() {
        let s = sprint(d(2025, 1, 6), d(2025, 1, 10), WorkingDays::WEEKDAYS);
        let tasks = vec![task("a", 5, Some(7)), task("b", 3, Some(9)), task("c", 2, None)];
        let series = generate_burndown(&s, &tasks, &[], at(9));

        assert_eq!(series[0].actual_remaining, 10.0);
        assert_eq!(series[1].actual_remaining, 5.0);
        assert_eq!(series[1].completed_points, Some(5));
        assert_eq!(series[3].actual_remaining, 2.0);
        assert!(series[3].is_today);
        // Friday is in the future: projects the ideal line
        assert!(series[4].is_projected);
        assert_eq!(series[4].actual_remaining, series[4].ideal_remaining);
        assert_eq!(series[4].completed_points, None);
    }

    #[test]
    fn test_all_done_reaches_zero_at_end() {
        let s = sprint(d(2025, 1, 6), d(2025, 1, 10), WorkingDays::WEEKDAYS);
        let tasks = vec![task("a", 5, Some(7)), task("b", 3, Some(10))];
        let series = generate_burndown(&s, &tasks, &[], at(20));
        assert_eq!(series.last().unwrap().actual_remaining, 0.0);
    }

    #[test]
    fn test_done_without_event_uses_created_at() {
        let s = sprint(d(2025, 1, 1), d(2025, 1, 3), WorkingDays::EVERY_DAY);
        let mut t = task("a", 4, None);
        t.status = TaskStatus::Done;
        let series = generate_burndown(&s, &[t], &[], at(3));
        assert_eq!(series[0].actual_remaining, 0.0);
    }

    #[test]
    fn test_manual_override_is_isolated() {
        let s = sprint(d(2025, 1, 6), d(2025, 1, 10), WorkingDays::WEEKDAYS);
        let tasks = vec![task("a", 25, Some(7)), task("b", 25, None)];
        let baseline = generate_burndown(&s, &tasks, &[], at(10));

        let entry = BurndownEntry::manual(d(2025, 1, 8), 40, 50, Some("scope added".into()), None);
        let series = generate_burndown(&s, &tasks, &[entry], at(10));

        assert_eq!(series[2].actual_remaining, 40.0);
        assert_eq!(series[2].completed_points, Some(10));
        assert!(series[2].is_manual);
        assert_eq!(series[2].note.as_deref(), Some("scope added"));
        // Ideal line and neighbours are untouched
        for i in [0, 1, 3, 4] {
            assert_eq!(series[i], baseline[i]);
        }
        for i in 0..5 {
            assert_eq!(series[i].ideal_remaining, baseline[i].ideal_remaining);
        }
    }

    #[test]
    fn test_manual_override_on_future_day() {
        let s = sprint(d(2025, 1, 6), d(2025, 1, 10), WorkingDays::WEEKDAYS);
        let tasks = vec![task("a", 10, None)];
        let entry = BurndownEntry::manual(d(2025, 1, 10), 7, 10, None, None);
        let series = generate_burndown(&s, &tasks, &[entry], at(6));
        assert!(series[4].is_manual);
        assert!(!series[4].is_projected);
        assert_eq!(series[4].actual_remaining, 7.0);
    }

    #[test]
    fn test_total_recomputed_from_tasks() {
        let s = sprint(d(2025, 1, 6), d(2025, 1, 6), WorkingDays::WEEKDAYS);
        let mut t = task("a", 0, None);
        t.points = None;
        t.priority = Priority::High;
        let series = generate_burndown(&s, &[t], &[], at(6));
        // 8 from priority, not the 999 stored on the sprint
        assert_eq!(series[0].actual_remaining, 8.0);
    }

    #[test]
    fn test_inverted_sprint_is_empty() {
        let s = sprint(d(2025, 1, 10), d(2025, 1, 6), WorkingDays::WEEKDAYS);
        assert!(generate_burndown(&s, &[], &[], at(8)).is_empty());
    }
}
