//! Normalized domain types.
//!
//! These are produced once by [`crate::snapshot`] ingestion. Every status and
//! priority has already been folded into a closed enum and every timestamp
//! into a `DateTime<Utc>`, so the metric code never re-interprets strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar::WorkingDays;
use crate::date_util::date_key;
use crate::events::{self, Marker};

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Fold a free-form board status ("Done", "in_progress", "In Review", ...)
    /// into one of the three states. Unknown labels count as `Todo`.
    pub fn from_label(label: &str) -> Self {
        match squash(label).as_str() {
            "done" | "completed" | "complete" | "closed" | "finished" => TaskStatus::Done,
            "inprogress" | "doing" | "started" | "review" | "inreview" | "active" => {
                TaskStatus::InProgress
            }
            _ => TaskStatus::Todo,
        }
    }
}

/// Task priority, used to estimate points when none were given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Absent or unrecognized priorities are `Low`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(squash).as_deref() {
            Some("high" | "urgent" | "critical") => Priority::High,
            Some("medium" | "normal") => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn fallback_points(self) -> i64 {
        match self {
            Priority::High => 8,
            Priority::Medium => 5,
            Priority::Low => 3,
        }
    }
}

/// Type tag of a progress-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Created,
    StatusChange,
    Other(String),
}

impl EventKind {
    pub fn from_label(label: &str) -> Self {
        match squash(label).as_str() {
            "created" | "create" => EventKind::Created,
            "statuschange" | "status" | "moved" => EventKind::StatusChange,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// One entry in a task's append-only progress log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub title: Option<String>,
    /// Explicit estimate; `None` falls back to the priority table.
    pub points: Option<i64>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub progress_log: Vec<ProgressEvent>,
}

impl Task {
    /// Resolved story points: the explicit estimate, else the priority fallback.
    pub fn points(&self) -> i64 {
        match self.points {
            Some(p) if p >= 0 => p,
            _ => self.priority.fallback_points(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// When the task was completed: its first "entered done" event, else its
    /// creation time. `None` unless the task is currently done.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        if !self.is_done() {
            return None;
        }
        Some(
            events::marker_instant(&self.progress_log, Marker::EnteredDone)
                .unwrap_or(self.created_at),
        )
    }

    /// First "entered in-progress" event, if any.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        events::marker_instant(&self.progress_log, Marker::EnteredInProgress)
    }
}

/// Sprint time window and planning parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintConfig {
    pub id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Stored total; advisory only. Metrics recompute it from the tasks.
    pub total_points: i64,
    pub working_days: WorkingDays,
    pub sprint_goal: Option<String>,
    pub velocity_target: Option<f64>,
}

impl SprintConfig {
    /// Key under which manual overrides for this sprint are stored.
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!("{}..{}", date_key(self.start_date), date_key(self.end_date)),
        }
    }
}

/// A member of the board's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collaborator {
    pub name: String,
    pub email: Option<String>,
}

impl Collaborator {
    /// Whether a task's `assigned_to` refers to this collaborator (by email or name).
    pub fn matches(&self, assignee: &str) -> bool {
        let assignee = assignee.trim();
        if assignee.is_empty() {
            return false;
        }
        self.name.trim().eq_ignore_ascii_case(assignee)
            || self
                .email
                .as_deref()
                .is_some_and(|e| e.trim().eq_ignore_ascii_case(assignee))
    }
}

/// A human correction to one day of the burndown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurndownEntry {
    pub date: NaiveDate,
    pub remaining_points: i64,
    pub completed_points: i64,
    pub note: Option<String>,
    pub is_manual: bool,
    pub updated_by: Option<String>,
}

impl BurndownEntry {
    /// A manual entry; completed points are derived from the sprint total at entry time.
    pub fn manual(
        date: NaiveDate,
        remaining_points: i64,
        total_points: i64,
        note: Option<String>,
        updated_by: Option<String>,
    ) -> Self {
        Self {
            date,
            remaining_points,
            completed_points: total_points - remaining_points,
            note,
            is_manual: true,
            updated_by,
        }
    }
}

/// Everything the engine needs from the board, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintSnapshot {
    pub sprint: SprintConfig,
    pub tasks: Vec<Task>,
    pub collaborators: Vec<Collaborator>,
    pub burndown_entries: Vec<BurndownEntry>,
}

/// Lowercase and drop whitespace, `-` and `_`.
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
