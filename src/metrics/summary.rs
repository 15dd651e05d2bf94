use chrono::{DateTime, Utc};

use crate::calendar::{total_working_days, working_days_elapsed};
use crate::metrics::types::{ContributorMetric, Projection, SprintSummary, VelocityBucket};
use crate::metrics::{completed_points, finite_or_zero, mean, percentage, total_points};
use crate::model::{SprintConfig, Task};

/// Roll the per-series results up into one record.
pub fn summarize(
    sprint: &SprintConfig,
    tasks: &[Task],
    velocity: &[VelocityBucket],
    contributors: &[ContributorMetric],
    avg_cycle_time: f64,
    now: DateTime<Utc>,
) -> SprintSummary {
    let total = total_points(tasks);
    let completed = completed_points(tasks);
    let remaining = (total - completed).max(0);

    let weekly: Vec<f64> = velocity.iter().map(|b| b.completed as f64).collect();
    let avg_velocity = mean(&weekly);
    let predicted_velocity = if weekly.len() >= 3 {
        mean(&weekly[weekly.len() - 3..])
    } else {
        avg_velocity
    };

    let efficiencies: Vec<f64> = contributors.iter().map(|c| c.efficiency).collect();

    let today = now.date_naive().min(sprint.end_date);

    SprintSummary {
        sprint_key: sprint.key(),
        sprint_goal: sprint.sprint_goal.clone(),
        velocity_target: sprint.velocity_target,
        total_points: total,
        completed_points: completed,
        remaining_points: remaining,
        completion_rate: finite_or_zero(percentage(completed as f64, total as f64)),
        avg_velocity,
        predicted_velocity,
        projected_completion: project_completion(remaining, avg_velocity),
        team_efficiency: mean(&efficiencies),
        avg_cycle_time: finite_or_zero(avg_cycle_time),
        working_days_elapsed: working_days_elapsed(sprint.start_date, today, sprint.working_days),
        working_days_total: total_working_days(
            sprint.start_date,
            sprint.end_date,
            sprint.working_days,
        ),
    }
}

/// Weeks at `avg_velocity` points per week needed to burn `remaining` points.
pub fn project_completion(remaining: i64, avg_velocity: f64) -> Projection {
    if remaining <= 0 {
        return Projection::Known { weeks: 0 };
    }
    if !(avg_velocity.is_finite() && avg_velocity > 0.0) {
        return Projection::Unknown;
    }
    let periods = (remaining as f64 / avg_velocity).ceil();
    if periods.is_finite() && periods <= u32::MAX as f64 {
        Projection::Known {
            weeks: periods as u32,
        }
    } else {
        Projection::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WorkingDays;
    use crate::model::{Priority, TaskStatus};
    use chrono::{NaiveDate, TimeZone};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sprint() -> SprintConfig {
        SprintConfig {
            id: Some("s9".into()),
            start_date: d(2025, 1, 6),
            end_date: d(2025, 1, 17),
            total_points: 0,
            working_days: WorkingDays::WEEKDAYS,
            sprint_goal: Some("Ship it".into()),
            velocity_target: Some(20.0),
        }
    }

    fn task(points: i64, status: TaskStatus) -> Task {
        Task {
            id: "t".into(),
            title: None,
            points: Some(points),
            priority: Priority::Low,
            status,
            assigned_to: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            progress_log: vec![],
        }
    }

    fn bucket(completed: i64) -> VelocityBucket {
        VelocityBucket {
            label: String::new(),
            start: d(2025, 1, 1),
            end: d(2025, 1, 8),
            completed,
            capacity: 40,
            utilization: 0.0,
            trend: 0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_rollup() {
        let tasks = vec![task(10, TaskStatus::Done), task(30, TaskStatus::InProgress)];
        let velocity = vec![bucket(2), bucket(4), bucket(6), bucket(8)];
        let s = summarize(&sprint(), &tasks, &velocity, &[], 2.5, now());

        assert_eq!(s.sprint_key, "s9");
        assert_eq!(s.total_points, 40);
        assert_eq!(s.completed_points, 10);
        assert_eq!(s.remaining_points, 30);
        assert_eq!(s.completion_rate, 25.0);
        assert_eq!(s.avg_velocity, 5.0);
        assert_eq!(s.predicted_velocity, 6.0);
        assert_eq!(s.projected_completion, Projection::Known { weeks: 6 });
        assert_eq!(s.avg_cycle_time, 2.5);
        assert_eq!(s.working_days_elapsed, 3);
        assert_eq!(s.working_days_total, 10);
        assert_eq!(s.velocity_target, Some(20.0));
    }

    #[test]
    fn test_predicted_falls_back_to_average() {
        let s = summarize(&sprint(), &[], &[bucket(3), bucket(5)], &[], 0.0, now());
        assert_eq!(s.avg_velocity, 4.0);
        assert_eq!(s.predicted_velocity, 4.0);
    }

    #[test]
    fn test_zero_contributors_efficiency_is_zero() {
        let s = summarize(&sprint(), &[task(5, TaskStatus::Todo)], &[], &[], 0.0, now());
        assert_eq!(s.team_efficiency, 0.0);
        assert_eq!(s.avg_velocity, 0.0);
        assert_eq!(s.completion_rate, 0.0);
    }

    #[test]
    fn test_projection() {
        assert_eq!(project_completion(0, 0.0), Projection::Known { weeks: 0 });
        assert_eq!(project_completion(10, 0.0), Projection::Unknown);
        assert_eq!(project_completion(10, f64::NAN), Projection::Unknown);
        assert_eq!(project_completion(10, 3.0), Projection::Known { weeks: 4 });
        assert_eq!(project_completion(-5, 3.0), Projection::Known { weeks: 0 });
    }

    #[test]
    fn test_empty_sprint_has_no_nan() {
        let s = summarize(&sprint(), &[], &[], &[], f64::NAN, now());
        assert_eq!(s.projected_completion, Projection::Known { weeks: 0 });
        for v in [
            s.completion_rate,
            s.avg_velocity,
            s.predicted_velocity,
            s.team_efficiency,
            s.avg_cycle_time,
        ] {
            assert!(v.is_finite());
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_projection_serializes_tagged() {
        assert_eq!(
            serde_json::to_string(&Projection::Unknown).unwrap(),
            r#"{"status":"unknown"}"#
        );
        assert_eq!(
            serde_json::to_string(&Projection::Known { weeks: 3 }).unwrap(),
            r#"{"status":"known","weeks":3}"#
        );
    }

    #[test]
    fn test_projection_display_counts_weeks() {
        // 30 points left at 8 points a week
        let p = project_completion(30, 8.0);
        assert_eq!(p, Projection::Known { weeks: 4 });
        assert_eq!(p.to_string(), "4 weeks");
        assert_eq!(Projection::Known { weeks: 1 }.to_string(), "1 week");
        assert_eq!(Projection::Unknown.to_string(), "unknown");
    }
}
