//! Daily completion streak.
//!
//! A streak counts consecutive calendar days with at least one completed
//! session. Dates are plain calendar dates (`NaiveDate`) so that time of day,
//! time zone offsets and daylight-saving shifts never enter the comparison.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted streak state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakRecord {
    pub count: u32,
    /// Serialized as an ISO calendar date (`YYYY-MM-DD`).
    #[serde(default)]
    pub last_session_date: Option<NaiveDate>,
}

impl StreakRecord {
    pub fn new(count: u32, last_session_date: NaiveDate) -> Self {
        Self {
            count,
            last_session_date: Some(last_session_date),
        }
    }

    /// Streak value to display on `today`.
    ///
    /// A streak whose last day is before yesterday is already broken, even
    /// though the stored count is only reset at the next completion.
    pub fn live_count(&self, today: NaiveDate) -> u32 {
        match self.last_session_date {
            Some(last) if last == today || Some(last) == today.pred_opt() => self.count,
            _ => 0,
        }
    }
}

/// Streak state after a session completes on `today`.
///
/// - same day as the last completion: unchanged (at most one increment a day)
/// - the day after: incremented
/// - anything else, including no prior completion: restarts at 1
pub fn next_streak(today: NaiveDate, record: &StreakRecord) -> StreakRecord {
    match record.last_session_date {
        Some(last) if last == today => *record,
        Some(last) if Some(last) == today.pred_opt() => StreakRecord {
            count: record.count.saturating_add(1),
            last_session_date: Some(today),
        },
        _ => StreakRecord::new(1, today),
    }
}
