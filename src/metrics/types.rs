use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One day of the burndown chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurndownPoint {
    pub date: NaiveDate,
    pub ideal_remaining: f64,
    pub actual_remaining: f64,
    /// `None` on future days, where the actual line is a projection.
    pub completed_points: Option<i64>,
    pub is_today: bool,
    pub is_working_day: bool,
    pub is_manual: bool,
    pub is_projected: bool,
    pub note: Option<String>,
}

/// Completed points for one trailing week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityBucket {
    pub label: String,
    /// First day of the bucket.
    pub start: NaiveDate,
    /// Day after the bucket (exclusive).
    pub end: NaiveDate,
    pub completed: i64,
    pub capacity: i64,
    /// Completed as a percentage of capacity.
    pub utilization: f64,
    /// Change in completed points from the previous bucket.
    pub trend: i64,
}

/// Cycle time of a single task, in whole days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskCycleTime {
    pub task_id: String,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleTimeBucket {
    pub bucket: String,
    pub count: u64,
    /// Rounded share of measured tasks.
    pub percentage: u32,
}

/// Summary statistics over tasks that have both an in-progress and a done marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleTimeStats {
    pub tasks_measured: u64,
    pub avg_days: f64,
    pub median_days: Option<f64>,
    pub p90_days: Option<f64>,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleTimeReport {
    pub per_task: Vec<TaskCycleTime>,
    pub stats: CycleTimeStats,
    pub distribution: Vec<CycleTimeBucket>,
}

/// Workload and throughput for one collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorMetric {
    pub name: String,
    pub email: Option<String>,
    pub tasks_total: u64,
    pub tasks_completed: u64,
    pub tasks_in_progress: u64,
    pub tasks_todo: u64,
    pub points_total: i64,
    pub points_completed: i64,
    pub points_in_progress: i64,
    pub points_todo: i64,
    pub avg_cycle_time: f64,
    /// Completed tasks as a percentage of assigned tasks.
    pub efficiency: f64,
    /// Points still open (in progress + todo).
    pub workload: i64,
    /// Completed points per week over the analysis window.
    pub velocity: f64,
}

/// Tasks created and completed on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub created: u64,
    pub completed: u64,
    pub net: i64,
    pub cumulative: i64,
}

/// Estimated time left at the average weekly velocity, when one can be computed.
///
/// Velocity buckets are one week long, so the estimate counts weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Projection {
    Known { weeks: u32 },
    Unknown,
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Projection::Known { weeks: 1 } => write!(f, "1 week"),
            Projection::Known { weeks } => write!(f, "{weeks} weeks"),
            Projection::Unknown => write!(f, "unknown"),
        }
    }
}

/// Top-level sprint rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintSummary {
    pub sprint_key: String,
    pub sprint_goal: Option<String>,
    pub velocity_target: Option<f64>,
    pub total_points: i64,
    pub completed_points: i64,
    pub remaining_points: i64,
    pub completion_rate: f64,
    pub avg_velocity: f64,
    pub predicted_velocity: f64,
    pub projected_completion: Projection,
    pub team_efficiency: f64,
    pub avg_cycle_time: f64,
    pub working_days_elapsed: u32,
    pub working_days_total: u32,
}

/// Every series for one sprint, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintReport {
    pub sprint_key: String,
    pub generated_at: DateTime<Utc>,
    pub window: String,
    pub burndown: Vec<BurndownPoint>,
    pub velocity: Vec<VelocityBucket>,
    pub cycle_time: CycleTimeReport,
    pub contributors: Vec<ContributorMetric>,
    pub completion_trend: Vec<TrendPoint>,
    pub summary: SprintSummary,
}
