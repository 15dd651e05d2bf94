use crate::metrics::cycle_time::task_cycle_time;
use crate::metrics::types::ContributorMetric;
use crate::metrics::{finite_or_zero, percentage};
use crate::model::{Collaborator, Task, TaskStatus};

/// The people metrics are reported for: the board roster when there is one,
/// otherwise every distinct assignee in task order.
pub fn resolve_contributors(roster: &[Collaborator], tasks: &[Task]) -> Vec<Collaborator> {
    if !roster.is_empty() {
        return roster.to_vec();
    }
    let mut seen: Vec<Collaborator> = Vec::new();
    for assignee in tasks.iter().filter_map(|t| t.assigned_to.as_deref()) {
        if seen.iter().any(|c| c.matches(assignee)) {
            continue;
        }
        seen.push(Collaborator {
            name: assignee.to_string(),
            email: assignee.contains('@').then(|| assignee.to_string()),
        });
    }
    seen
}

/// Per-collaborator workload and throughput, highest completed points first.
///
/// `range_days` is the length of the analysis window; velocity is completed
/// points per week over `max(1, ceil(range_days / 7))` weeks.
pub fn aggregate_contributors(
    roster: &[Collaborator],
    tasks: &[Task],
    range_days: i64,
) -> Vec<ContributorMetric> {
    let weeks = ((range_days.max(0) + 6) / 7).max(1) as f64;

    let mut metrics: Vec<ContributorMetric> = resolve_contributors(roster, tasks)
        .into_iter()
        .map(|c| {
            let mine: Vec<&Task> = tasks
                .iter()
                .filter(|t| t.assigned_to.as_deref().is_some_and(|a| c.matches(a)))
                .collect();

            let count =
                |status: TaskStatus| mine.iter().filter(|t| t.status == status).count() as u64;
            let points = |status: TaskStatus| -> i64 {
                mine.iter()
                    .filter(|t| t.status == status)
                    .map(|t| t.points())
                    .sum()
            };

            let tasks_total = mine.len() as u64;
            let tasks_completed = count(TaskStatus::Done);
            let points_completed = points(TaskStatus::Done);
            let points_in_progress = points(TaskStatus::InProgress);
            let points_todo = points(TaskStatus::Todo);

            let cycle_days: Vec<i64> = mine.iter().filter_map(|t| task_cycle_time(t)).collect();
            let avg_cycle_time = if cycle_days.is_empty() {
                0.0
            } else {
                cycle_days.iter().sum::<i64>() as f64 / cycle_days.len() as f64
            };

            ContributorMetric {
                name: c.name,
                email: c.email,
                tasks_total,
                tasks_completed,
                tasks_in_progress: count(TaskStatus::InProgress),
                tasks_todo: count(TaskStatus::Todo),
                points_total: points_completed + points_in_progress + points_todo,
                points_completed,
                points_in_progress,
                points_todo,
                avg_cycle_time: finite_or_zero(avg_cycle_time),
                efficiency: finite_or_zero(percentage(tasks_completed as f64, tasks_total as f64)),
                workload: points_in_progress + points_todo,
                velocity: finite_or_zero(points_completed as f64 / weeks),
            }
        })
        .collect();

    metrics.sort_by(|a, b| {
        b.points_completed
            .cmp(&a.points_completed)
            .then_with(|| a.name.cmp(&b.name))
    });
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Priority, ProgressEvent};
    use chrono::{Duration, TimeZone, Utc};

    fn task(assignee: Option<&str>, points: Option<i64>, status: TaskStatus) -> Task {
        Task {
            id: "t".into(),
            title: None,
            points,
            priority: Priority::High,
            status,
            assigned_to: assignee.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            progress_log: vec![],
        }
    }

    fn alice() -> Collaborator {
        Collaborator {
            name: "Alice".into(),
            email: Some("alice@example.com".into()),
        }
    }

    fn bob() -> Collaborator {
        Collaborator {
            name: "Bob".into(),
            email: Some("bob@example.com".into()),
        }
    }

    #[test]
    fn test_partition_by_status() {
        let tasks = vec![
            task(Some("alice@example.com"), Some(5), TaskStatus::Done),
            task(Some("Alice"), Some(3), TaskStatus::InProgress),
            task(Some("alice@example.com"), None, TaskStatus::Todo),
            task(Some("bob@example.com"), Some(2), TaskStatus::Done),
        ];
        let metrics = aggregate_contributors(&[bob(), alice()], &tasks, 14);
        assert_eq!(metrics.len(), 2);

        let a = &metrics[0];
        assert_eq!(a.name, "Alice");
        assert_eq!(a.tasks_total, 3);
        assert_eq!(a.tasks_completed, 1);
        assert_eq!(a.tasks_in_progress, 1);
        assert_eq!(a.tasks_todo, 1);
        assert_eq!(a.points_completed, 5);
        assert_eq!(a.points_in_progress, 3);
        // Missing points with High priority count as 8
        assert_eq!(a.points_todo, 8);
        assert_eq!(a.points_total, 16);
        assert_eq!(a.workload, 11);
        assert!((a.efficiency - 100.0 / 3.0).abs() < 1e-9);
        // 14 days = 2 weeks
        assert_eq!(a.velocity, 2.5);

        assert_eq!(metrics[1].name, "Bob");
        assert_eq!(metrics[1].efficiency, 100.0);
    }

    #[test]
    fn test_roster_member_without_tasks() {
        let metrics = aggregate_contributors(&[alice()], &[], 30);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].efficiency, 0.0);
        assert_eq!(metrics[0].velocity, 0.0);
        assert_eq!(metrics[0].avg_cycle_time, 0.0);
    }

    #[test]
    fn test_falls_back_to_assignees() {
        let tasks = vec![
            task(Some("carol"), Some(1), TaskStatus::Done),
            task(Some("dave@example.com"), Some(2), TaskStatus::Todo),
            task(Some("Carol"), Some(1), TaskStatus::Todo),
            task(None, Some(5), TaskStatus::Done),
        ];
        let people = resolve_contributors(&[], &tasks);
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name, "carol");
        assert_eq!(people[1].email.as_deref(), Some("dave@example.com"));

        let metrics = aggregate_contributors(&[], &tasks, 7);
        assert_eq!(metrics[0].name, "carol");
        assert_eq!(metrics[0].tasks_total, 2);
        assert_eq!(metrics[0].efficiency, 50.0);
    }

    #[test]
    fn test_no_contributors() {
        let tasks = [task(None, Some(3), TaskStatus::Done)];
        assert!(aggregate_contributors(&[], &tasks, 7).is_empty());
    }

    #[test]
    fn test_sort_ties_by_name() {
        let tasks = vec![
            task(Some("bob@example.com"), Some(4), TaskStatus::Done),
            task(Some("alice@example.com"), Some(4), TaskStatus::Done),
        ];
        let metrics = aggregate_contributors(&[bob(), alice()], &tasks, 7);
        assert_eq!(metrics[0].name, "Alice");
        assert_eq!(metrics[1].name, "Bob");
    }

    #[test]
    fn test_completed_never_exceeds_total() {
        let tasks = vec![
            task(Some("Alice"), Some(0), TaskStatus::Done),
            task(Some("Alice"), None, TaskStatus::Done),
            task(Some("Alice"), Some(1), TaskStatus::Todo),
        ];
        for m in aggregate_contributors(&[alice()], &tasks, 0) {
            assert!(m.points_completed <= m.points_total);
        }
    }

    #[test]
    fn test_avg_cycle_time() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let mut t = task(Some("Alice"), Some(3), TaskStatus::Done);
        t.progress_log = vec![
            ProgressEvent {
                kind: EventKind::StatusChange,
                description: "Moved to In Progress".into(),
                timestamp: start,
                user: None,
            },
            ProgressEvent {
                kind: EventKind::StatusChange,
                description: "Moved to Done".into(),
                timestamp: start + Duration::days(4),
                user: None,
            },
        ];
        let metrics = aggregate_contributors(&[alice()], &[t], 7);
        assert_eq!(metrics[0].avg_cycle_time, 4.0);
    }
}
