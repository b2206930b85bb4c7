//! SQLite-based storage.
//!
//! Provides persistent storage for:
//! - Finished breathing sessions (completed and aborted)
//! - Session statistics (per day and all-time)
//! - Key-value store for application state (the streak record lives here)

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result};

/// A session as it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub duration_min: u32,
    /// Cycles actually started before the session ended.
    pub cycles: u64,
    pub completed: bool,
    pub music: Option<String>,
    /// Local calendar date the session ended on.
    pub session_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    #[serde(flatten)]
    pub entry: SessionEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub aborted_sessions: u64,
    pub completed_minutes: u64,
    pub completed_cycles: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/breathroom/breathroom.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("breathroom.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and ephemeral runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                duration_min INTEGER NOT NULL,
                cycles       INTEGER NOT NULL,
                completed    INTEGER NOT NULL,
                music        TEXT,
                session_date TEXT NOT NULL,
                started_at   TEXT NOT NULL,
                ended_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_session_date ON sessions(session_date);",
        )?;
        Ok(())
    }

    /// Record a finished session.
    pub fn record_session(&self, entry: &SessionEntry) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (duration_min, cycles, completed, music, session_date, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.duration_min,
                entry.cycles,
                entry.completed,
                entry.music,
                entry.session_date.format("%Y-%m-%d").to_string(),
                entry.started_at.to_rfc3339(),
                entry.ended_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions, newest first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, duration_min, cycles, completed, music, session_date, started_at, ended_at
             FROM sessions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, duration_min, cycles, completed, music, date, started, ended) = row?;
            out.push(SessionRecord {
                id,
                entry: SessionEntry {
                    duration_min,
                    cycles,
                    completed,
                    music,
                    session_date: parse_date(&date)?,
                    started_at: parse_timestamp(&started)?,
                    ended_at: parse_timestamp(&ended)?,
                },
            });
        }
        Ok(out)
    }

    /// Stats for sessions that ended on `date`.
    pub fn stats_on(&self, date: NaiveDate) -> Result<Stats> {
        self.aggregate(Some(date))
    }

    pub fn stats_all(&self) -> Result<Stats> {
        self.aggregate(None)
    }

    fn aggregate(&self, date: Option<NaiveDate>) -> Result<Stats> {
        let date = date.map(|d| d.format("%Y-%m-%d").to_string());
        let mut stmt = self.conn.prepare(
            "SELECT completed, COUNT(*), COALESCE(SUM(duration_min), 0), COALESCE(SUM(cycles), 0)
             FROM sessions
             WHERE ?1 IS NULL OR session_date = ?1
             GROUP BY completed",
        )?;
        let rows = stmt.query_map(params![date], |row| {
            Ok((
                row.get::<_, bool>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (completed, count, minutes, cycles) = row?;
            stats.total_sessions += count;
            if completed {
                stats.completed_sessions += count;
                stats.completed_minutes += minutes;
                stats.completed_cycles += cycles;
            } else {
                stats.aborted_sessions += count;
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store. A single statement, so the previous value
    /// is either fully kept or fully replaced.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| DatabaseError::QueryFailed(format!("bad session_date '{raw}': {e}")).into())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(date: NaiveDate, completed: bool, minutes: u32, cycles: u64) -> SessionEntry {
        let started_at = Utc::now();
        SessionEntry {
            duration_min: minutes,
            cycles,
            completed,
            music: Some("rain".into()),
            session_date: date,
            started_at,
            ended_at: started_at + Duration::minutes(i64::from(minutes)),
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        db.record_session(&entry(d, true, 5, 16)).unwrap();
        db.record_session(&entry(d, false, 10, 2)).unwrap();
        db.record_session(&entry(d.succ_opt().unwrap(), true, 1, 3))
            .unwrap();

        let all = db.stats_all().unwrap();
        assert_eq!(all.total_sessions, 3);
        assert_eq!(all.completed_sessions, 2);
        assert_eq!(all.aborted_sessions, 1);
        assert_eq!(all.completed_minutes, 6);
        assert_eq!(all.completed_cycles, 19);

        let day = db.stats_on(d).unwrap();
        assert_eq!(day.total_sessions, 2);
        assert_eq!(day.completed_minutes, 5);
    }

    #[test]
    fn recent_sessions_newest_first() {
        let db = Database::open_memory().unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        db.record_session(&entry(d, true, 5, 16)).unwrap();
        let last = db.record_session(&entry(d, false, 3, 1)).unwrap();

        let recent = db.recent_sessions(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, last);
        assert!(!recent[0].entry.completed);
        assert_eq!(recent[0].entry.session_date, d);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        db.kv_set("test", "world").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "world");
    }

    #[test]
    fn open_at_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breathroom.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
