use std::collections::HashMap;

use chrono::NaiveDate;

use crate::date_util::days_inclusive;
use crate::metrics::types::TrendPoint;
use crate::model::Task;

/// Daily created vs. completed counts over `[start, end]` with a running net.
pub fn completion_trend(tasks: &[Task], start: NaiveDate, end: NaiveDate) -> Vec<TrendPoint> {
    let mut created: HashMap<NaiveDate, u64> = HashMap::new();
    let mut completed: HashMap<NaiveDate, u64> = HashMap::new();
    for task in tasks {
        *created.entry(task.created_at.date_naive()).or_default() += 1;
        if let Some(at) = task.completed_at() {
            *completed.entry(at.date_naive()).or_default() += 1;
        }
    }

    let mut cumulative = 0i64;
    days_inclusive(start, end)
        .map(|date| {
            let created = created.get(&date).copied().unwrap_or(0);
            let completed = completed.get(&date).copied().unwrap_or(0);
            let net = completed as i64 - created as i64;
            cumulative += net;
            TrendPoint {
                date,
                created,
                completed,
                net,
                cumulative,
            }
        })
        .collect()
}
