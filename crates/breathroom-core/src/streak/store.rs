//! Streak persistence.
//!
//! The record lives under one fixed key as a JSON document. Missing or
//! unparseable data is treated as "no streak yet"; only a failure to read the
//! medium itself is an error.

use tracing::warn;

use super::policy::StreakRecord;
use crate::error::Result;
use crate::storage::Database;

/// Key-value key the streak record is stored under.
pub const STREAK_KEY: &str = "breathing_streak";

pub trait StreakStore {
    /// Current record, or the default record if nothing usable is stored.
    ///
    /// # Errors
    /// The backing medium could not be read.
    fn load(&self) -> Result<StreakRecord>;

    /// Replace the stored record as a whole.
    fn save(&mut self, record: &StreakRecord) -> Result<()>;
}

fn decode(raw: Option<&str>) -> StreakRecord {
    let Some(raw) = raw else {
        return StreakRecord::default();
    };
    match serde_json::from_str::<StreakRecord>(raw) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "discarding corrupt streak record");
            StreakRecord::default()
        }
    }
}

impl StreakStore for Database {
    fn load(&self) -> Result<StreakRecord> {
        let raw = self.kv_get(STREAK_KEY)?;
        Ok(decode(raw.as_deref()))
    }

    fn save(&mut self, record: &StreakRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.kv_set(STREAK_KEY, &json)?;
        Ok(())
    }
}

/// In-memory store, holding the raw serialized form like a real medium.
#[derive(Debug, Default, Clone)]
pub struct MemoryStreakStore {
    raw: Option<String>,
}

impl MemoryStreakStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary stored payload (possibly corrupt).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn with_record(record: &StreakRecord) -> Self {
        Self {
            raw: serde_json::to_string(record).ok(),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl StreakStore for MemoryStreakStore {
    fn load(&self) -> Result<StreakRecord> {
        Ok(decode(self.raw.as_deref()))
    }

    fn save(&mut self, record: &StreakRecord) -> Result<()> {
        self.raw = Some(serde_json::to_string(record)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> StreakRecord {
        StreakRecord::new(4, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap())
    }

    #[test]
    fn missing_data_loads_default() {
        assert_eq!(MemoryStreakStore::new().load().unwrap(), StreakRecord::default());
    }

    #[test]
    fn corrupt_data_loads_default() {
        for raw in ["", "not json", r#"{"count":-3}"#, r#"{"count":1,"lastSessionDate":"yesterday"}"#] {
            assert_eq!(
                MemoryStreakStore::with_raw(raw).load().unwrap(),
                StreakRecord::default(),
                "payload {raw:?}"
            );
        }
    }

    #[test]
    fn save_replaces_whole_record() {
        let mut store = MemoryStreakStore::with_raw(r#"{"count":99,"extra":true}"#);
        store.save(&record()).unwrap();
        assert_eq!(store.raw(), Some(r#"{"count":4,"lastSessionDate":"2024-04-02"}"#));
        assert_eq!(store.load().unwrap(), record());
    }

    #[test]
    fn database_store_round_trips_under_fixed_key() {
        let mut db = Database::open_memory().unwrap();
        assert_eq!(db.load().unwrap(), StreakRecord::default());

        db.save(&record()).unwrap();
        assert_eq!(db.load().unwrap(), record());
        assert!(db.kv_get(STREAK_KEY).unwrap().unwrap().contains("2024-04-02"));
    }

    #[test]
    fn unreadable_database_is_an_error() {
        let db = Database::open_memory().unwrap();
        db.conn().execute("DROP TABLE kv", []).unwrap();
        assert!(db.load().is_err());
    }

    #[test]
    fn database_store_tolerates_corruption() {
        let db = Database::open_memory().unwrap();
        db.kv_set(STREAK_KEY, "{{{").unwrap();
        assert_eq!(db.load().unwrap(), StreakRecord::default());
    }
}
