//! Board snapshot loading and ingestion.
//!
//! The `Raw*` types mirror the JSON the board's persistence layer exports
//! (camelCase keys, loosely typed values). [`RawSnapshot::ingest`] turns them
//! into the normalized [`crate::model`] types exactly once.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calendar::WorkingDays;
use crate::date_util::parse_date_key;
use crate::error::{Error, Result};
use crate::model::{
    BurndownEntry, Collaborator, EventKind, Priority, ProgressEvent, SprintConfig, SprintSnapshot,
    Task, TaskStatus,
};
use crate::timestamp::{normalize, RawTimestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    pub sprint: RawSprintConfig,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
    #[serde(default)]
    pub collaborators: Vec<RawCollaborator>,
    #[serde(default)]
    pub burndown_entries: Vec<RawBurndownEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSprintConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub start_date: Option<RawTimestamp>,
    #[serde(default)]
    pub end_date: Option<RawTimestamp>,
    #[serde(default)]
    pub total_points: Option<Value>,
    #[serde(default)]
    pub working_days: Option<Vec<Value>>,
    #[serde(default)]
    pub sprint_goal: Option<String>,
    #[serde(default)]
    pub velocity_target: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub points: Option<Value>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<RawAssignee>,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
    #[serde(default)]
    pub progress_log: Vec<RawEvent>,
}

/// `assignedTo` is either a bare identifier or an embedded collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAssignee {
    Id(String),
    Ref {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

impl RawAssignee {
    fn resolve(&self) -> Option<String> {
        let s = match self {
            RawAssignee::Id(s) => Some(s.as_str()),
            RawAssignee::Ref { name, email } => email.as_deref().or(name.as_deref()),
        }?;
        let s = s.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCollaborator {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBurndownEntry {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub remaining_points: Option<Value>,
    #[serde(default)]
    pub completed_points: Option<Value>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl RawSnapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read and parse a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Snapshot(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Normalize into domain types. Unresolvable timestamps become `now`.
    pub fn ingest(&self, now: DateTime<Utc>) -> SprintSnapshot {
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(index, t)| ingest_task(index, t, now))
            .collect();
        let sprint = ingest_sprint(&self.sprint, now);
        let live_total: i64 = tasks.iter().map(Task::points).sum();

        let collaborators = self
            .collaborators
            .iter()
            .filter_map(|c| {
                let name = c.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
                Some((name, c))
            })
            .map(|(name, c)| Collaborator {
                name: name.to_string(),
                email: c
                    .email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            })
            .collect();

        let entries: Vec<BurndownEntry> = self
            .burndown_entries
            .iter()
            .filter_map(|e| match ingest_entry(e, live_total) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("Skipping burndown entry: {err}");
                    None
                }
            })
            .collect();

        SprintSnapshot {
            sprint,
            tasks,
            collaborators,
            burndown_entries: merge_overrides(&entries, &[]),
        }
    }
}

/// Combine overrides from the snapshot with stored ones: one entry per date,
/// stored entries replacing snapshot entries, ordered by date.
pub fn merge_overrides(snapshot: &[BurndownEntry], stored: &[BurndownEntry]) -> Vec<BurndownEntry> {
    let mut by_date: BTreeMap<NaiveDate, BurndownEntry> = BTreeMap::new();
    for entry in snapshot.iter().chain(stored) {
        by_date.insert(entry.date, entry.clone());
    }
    by_date.into_values().collect()
}

fn ingest_sprint(raw: &RawSprintConfig, now: DateTime<Utc>) -> SprintConfig {
    let start_date = normalize(raw.start_date.as_ref(), now).date_naive();
    let end_date = normalize(raw.end_date.as_ref(), now).date_naive();
    if end_date < start_date {
        log::warn!("Sprint ends ({end_date}) before it starts ({start_date})");
    }
    let working_days = match &raw.working_days {
        Some(values) => {
            let indices: Vec<i64> = values
                .iter()
                .filter_map(|v| {
                    let i = lenient_int(v);
                    if i.is_none() {
                        log::warn!("Ignoring non-numeric working-day index {v}");
                    }
                    i
                })
                .collect();
            WorkingDays::from_indices(&indices)
        }
        None => WorkingDays::default(),
    };
    SprintConfig {
        id: raw.id.clone(),
        start_date,
        end_date,
        total_points: raw.total_points.as_ref().and_then(lenient_int).unwrap_or(0),
        working_days,
        sprint_goal: raw.sprint_goal.clone(),
        velocity_target: raw.velocity_target.as_ref().and_then(lenient_float),
    }
}

fn ingest_entry(raw: &RawBurndownEntry, live_total: i64) -> Result<BurndownEntry> {
    let date = match &raw.date {
        Some(Value::String(s)) => parse_date_key(s)?,
        other => {
            return Err(Error::InvalidDate(format!(
                "expected YYYY-MM-DD, got {other:?}"
            )))
        }
    };
    let remaining_points = raw
        .remaining_points
        .as_ref()
        .and_then(lenient_int)
        .ok_or_else(|| {
            Error::Snapshot(format!("entry for {date} has no usable remainingPoints"))
        })?;
    Ok(BurndownEntry {
        date,
        remaining_points,
        completed_points: raw
            .completed_points
            .as_ref()
            .and_then(lenient_int)
            .unwrap_or(live_total - remaining_points),
        note: raw.note.clone(),
        is_manual: true,
        updated_by: raw.updated_by.clone(),
    })
}

/// Tasks without a usable id are keyed by their position in the snapshot.
fn ingest_task(index: usize, raw: &RawTask, now: DateTime<Utc>) -> Task {
    let id = match &raw.id {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            log::warn!("Task at position {index} has no id; using its position");
            index.to_string()
        }
    };
    let progress_log = raw
        .progress_log
        .iter()
        .map(|e| ProgressEvent {
            kind: EventKind::from_label(e.kind.as_deref().unwrap_or("")),
            description: e.description.clone().unwrap_or_default(),
            timestamp: normalize(e.timestamp.as_ref(), now),
            user: e.user.clone(),
        })
        .collect();
    Task {
        id,
        title: raw.title.clone(),
        points: raw.points.as_ref().and_then(lenient_int),
        priority: Priority::from_label(raw.priority.as_deref()),
        status: TaskStatus::from_label(raw.status.as_deref().unwrap_or("")),
        assigned_to: raw.assigned_to.as_ref().and_then(RawAssignee::resolve),
        created_at: normalize(raw.created_at.as_ref(), now),
        progress_log,
    }
}

/// Accept `5`, `5.0`, or `"5"`; anything else is absent.
fn lenient_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| lenient_float(v).map(|f| f.round() as i64)),
        _ => lenient_float(v).map(|f| f.round() as i64),
    }
}

/// Accept `20`, `20.5`, or `"20.5"`; non-finite values are absent.
fn lenient_float(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}
