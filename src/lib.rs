pub mod calendar;
pub mod date_util;
pub mod error;
pub mod events;
pub mod metrics;
pub mod model;
pub mod snapshot;
pub mod storage;
pub mod timestamp;
pub mod window;

pub use calendar::WorkingDays;
pub use error::{Error, Result};
pub use metrics::{
    compute_sprint_report, BurndownPoint, ContributorMetric, CycleTimeReport, Projection,
    SprintReport, SprintSummary, TrendPoint, VelocityBucket,
};
pub use model::{BurndownEntry, Collaborator, SprintConfig, SprintSnapshot, Task, TaskStatus};
pub use snapshot::RawSnapshot;
pub use storage::Database;
pub use window::AnalysisWindow;

use chrono::{DateTime, NaiveDate, Utc};

use storage::repository;

/// Config key: default snapshot file path.
pub const CONFIG_SNAPSHOT_PATH: &str = "snapshot_path";
/// Config key: default analysis window (`7d`, `30d`, `90d`, `sprint`).
pub const CONFIG_VELOCITY_WINDOW: &str = "velocity_window";
/// Config key: name recorded on manual overrides.
pub const CONFIG_USER_NAME: &str = "user_name";

/// Main entry point: the metric engine plus the local override/config store.
pub struct SprintDW {
    db: Database,
}

impl SprintDW {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Metrics ────────────────────────────────────────────────────

    /// Ingest a raw snapshot and merge in stored manual overrides.
    /// Stored overrides replace snapshot overrides for the same date.
    pub async fn snapshot(&self, raw: &RawSnapshot, now: DateTime<Utc>) -> Result<SprintSnapshot> {
        let mut snap = raw.ingest(now);
        let stored = self.override_list(&snap.sprint.key()).await?;
        snap.burndown_entries = snapshot::merge_overrides(&snap.burndown_entries, &stored);
        Ok(snap)
    }

    /// Full report for a raw snapshot, including stored overrides.
    pub async fn report(
        &self,
        raw: &RawSnapshot,
        window: AnalysisWindow,
        now: DateTime<Utc>,
    ) -> Result<SprintReport> {
        let snap = self.snapshot(raw, now).await?;
        Ok(compute_sprint_report(&snap, window, now))
    }

    /// The window to use when none is given: stored config, else 30 days.
    pub async fn default_window(&self) -> Result<AnalysisWindow> {
        match self.config_get(CONFIG_VELOCITY_WINDOW).await? {
            Some(s) => AnalysisWindow::parse(&s),
            None => Ok(AnalysisWindow::default()),
        }
    }

    // ── Override commands ──────────────────────────────────────────

    /// Record a manual correction for one day of the sprint.
    ///
    /// Completed points are derived from the live task total at the time of
    /// the call. The entry replaces any existing one for the same date.
    pub async fn override_set(
        &self,
        snap: &SprintSnapshot,
        date: NaiveDate,
        remaining_points: i64,
        note: Option<String>,
        updated_by: Option<String>,
    ) -> Result<BurndownEntry> {
        if date < snap.sprint.start_date || date > snap.sprint.end_date {
            log::warn!(
                "Override date {date} is outside sprint {} ({} to {})",
                snap.sprint.key(),
                snap.sprint.start_date,
                snap.sprint.end_date
            );
        }
        let total = metrics::total_points(&snap.tasks);
        let entry = BurndownEntry::manual(date, remaining_points, total, note, updated_by);
        let sprint_key = snap.sprint.key();

        self.db
            .writer()
            .call({
                let entry = entry.clone();
                let sprint_key = sprint_key.clone();
                move |conn| {
                    repository::upsert_override(conn, &sprint_key, &entry)?;
                    Ok::<(), rusqlite::Error>(())
                }
            })
            .await?;

        log::info!("Stored override for {sprint_key} on {date}: {remaining_points} remaining");
        Ok(entry)
    }

    pub async fn override_remove(&self, sprint_key: &str, date: NaiveDate) -> Result<bool> {
        let removed = self
            .db
            .writer()
            .call({
                let sprint_key = sprint_key.to_string();
                move |conn| repository::remove_override(conn, &sprint_key, date)
            })
            .await?;
        if removed {
            log::info!("Removed override for {sprint_key} on {date}");
        }
        Ok(removed)
    }

    pub async fn override_list(&self, sprint_key: &str) -> Result<Vec<BurndownEntry>> {
        self.db
            .reader()
            .call({
                let sprint_key = sprint_key.to_string();
                move |conn| repository::list_overrides(conn, &sprint_key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Store a config value. Window values are validated before saving.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        if key == CONFIG_VELOCITY_WINDOW {
            AnalysisWindow::parse(value)?;
        }
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}
