use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::date_util::date_key;
use crate::model::BurndownEntry;

// ── Burndown overrides ─────────────────────────────────────────────

/// Insert or replace the override for `entry.date` in the given sprint.
pub fn upsert_override(
    conn: &Connection,
    sprint_key: &str,
    entry: &BurndownEntry,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO burndown_overrides (
            sprint_key, date_key, remaining_points, completed_points,
            note, updated_by, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
        params![
            sprint_key,
            date_key(entry.date),
            entry.remaining_points,
            entry.completed_points,
            entry.note,
            entry.updated_by,
        ],
    )?;
    Ok(())
}

pub fn remove_override(
    conn: &Connection,
    sprint_key: &str,
    date: NaiveDate,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "DELETE FROM burndown_overrides WHERE sprint_key = ?1 AND date_key = ?2",
        params![sprint_key, date_key(date)],
    )?;
    Ok(count > 0)
}

/// All overrides for a sprint, ordered by date.
pub fn list_overrides(
    conn: &Connection,
    sprint_key: &str,
) -> Result<Vec<BurndownEntry>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT date_key, remaining_points, completed_points, note, updated_by
         FROM burndown_overrides WHERE sprint_key = ?1 ORDER BY date_key",
    )?;
    let rows = stmt.query_map(params![sprint_key], |row| {
        let key: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&key, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(BurndownEntry {
            date,
            remaining_points: row.get(1)?,
            completed_points: row.get(2)?,
            note: row.get(3)?,
            is_manual: true,
            updated_by: row.get(4)?,
        })
    })?;
    rows.collect()
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}
