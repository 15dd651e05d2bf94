//! Working-day calendar arithmetic.
//!
//! Weekday indices follow the board convention: 0 = Sunday through 6 = Saturday.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Serialize, Serializer};

use crate::date_util::days_inclusive;
use crate::metrics::finite_or_zero;

/// The set of weekdays counted as working days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkingDays {
    mask: u8,
}

impl WorkingDays {
    /// Monday through Friday.
    pub const WEEKDAYS: WorkingDays = WorkingDays { mask: 0b0011_1110 };
    /// Every day of the week.
    pub const EVERY_DAY: WorkingDays = WorkingDays { mask: 0b0111_1111 };

    /// No working days at all.
    pub fn none() -> Self {
        Self { mask: 0 }
    }

    /// Build from weekday indices (0 = Sunday). Indices outside `0..=6` are dropped.
    pub fn from_indices(indices: &[i64]) -> Self {
        let mut mask = 0u8;
        for &i in indices {
            if (0..=6).contains(&i) {
                mask |= 1 << i;
            } else {
                log::warn!("Ignoring invalid working-day index {i} (expected 0-6)");
            }
        }
        Self { mask }
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.mask & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    /// Weekday indices in the set, ascending.
    pub fn indices(&self) -> Vec<u8> {
        (0..7).filter(|i| self.mask & (1 << i) != 0).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }
}

impl Default for WorkingDays {
    fn default() -> Self {
        Self::WEEKDAYS
    }
}

impl Serialize for WorkingDays {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.indices().serialize(serializer)
    }
}

/// Count of working days in `[start, as_of]`.
pub fn working_days_elapsed(start: NaiveDate, as_of: NaiveDate, working: WorkingDays) -> u32 {
    days_inclusive(start, as_of)
        .filter(|d| working.is_working_day(*d))
        .count() as u32
}

/// Count of working days in `[start, end]`.
pub fn total_working_days(start: NaiveDate, end: NaiveDate, working: WorkingDays) -> u32 {
    working_days_elapsed(start, end, working)
}

/// Linear ideal burndown value after `elapsed` of `total` working days.
///
/// With no working days there is nothing to decay over, so the full
/// `total_points` is returned.
pub fn ideal_remaining(total_points: f64, elapsed: u32, total: u32) -> f64 {
    if total == 0 {
        return finite_or_zero(total_points);
    }
    let fraction = elapsed as f64 / total as f64;
    finite_or_zero((total_points * (1.0 - fraction)).max(0.0))
}
