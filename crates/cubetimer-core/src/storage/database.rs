//! SQLite-based snapshot storage.
//!
//! Provides persistent storage for:
//! - Sessions and their solves, in list order
//! - Key-value store for the current session, cube type and settings

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::AppSettings;
use super::data_dir;
use super::migrations;
use super::snapshot::{Snapshot, SnapshotStore};
use crate::error::{Result, StorageError};
use crate::record::{SolveStore, TimeEntry};
use crate::session::{Session, DEFAULT_CUBE_TYPE};

const KEY_CURRENT_SESSION: &str = "current_session_id";
const KEY_CUBE_TYPE: &str = "cube_type";
const KEY_APP_SETTINGS: &str = "app_settings";

/// SQLite database holding the latest [`Snapshot`].
pub struct Database {
    conn: Connection,
}

fn corrupt(table: &str, message: impl Into<String>) -> StorageError {
    StorageError::CorruptRow {
        table: table.to_string(),
        message: message.into(),
    }
}

fn parse_uuid(table: &str, raw: &str) -> std::result::Result<Uuid, StorageError> {
    Uuid::parse_str(raw).map_err(|e| corrupt(table, format!("bad id '{raw}': {e}")))
}

fn from_millis(table: &str, ms: i64) -> std::result::Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| corrupt(table, format!("bad timestamp {ms}")))
}

struct TimeRow {
    id: String,
    session_id: String,
    time_ms: i64,
    scramble: String,
    plus_two: bool,
    dnf: bool,
    auto_dnf: bool,
    favorite: bool,
    comment: Option<String>,
    recorded_at: i64,
}

impl TimeRow {
    fn into_entry(self) -> std::result::Result<TimeEntry, StorageError> {
        Ok(TimeEntry {
            id: parse_uuid("times", &self.id)?,
            time: u64::try_from(self.time_ms)
                .map_err(|_| corrupt("times", format!("negative time {}", self.time_ms)))?,
            scramble: self.scramble,
            plus_two: self.plus_two,
            dnf: self.dnf,
            auto_dnf: self.auto_dnf,
            favorite: self.favorite,
            comment: self.comment,
            timestamp: from_millis("times", self.recorded_at)?,
        })
    }
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/cubetimer/cubetimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("cubetimer.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> std::result::Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> std::result::Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Replace the stored state with `snapshot` in one transaction.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM times", [])?;
        tx.execute("DELETE FROM sessions", [])?;
        {
            let mut insert_session = tx.prepare(
                "INSERT INTO sessions (id, position, name, cube_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_time = tx.prepare(
                "INSERT INTO times (id, session_id, position, time_ms, scramble, plus_two, dnf,
                                    auto_dnf, favorite, comment, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, session) in snapshot.sessions.iter().enumerate() {
                let session_id = session.id.to_string();
                insert_session.execute(params![
                    session_id,
                    position as i64,
                    session.name,
                    session.cube_type,
                    session.created_at.timestamp_millis(),
                ])?;
                for (position, entry) in session.times.entries().iter().enumerate() {
                    let time_ms = i64::try_from(entry.time)
                        .map_err(|_| StorageError::QueryFailed(format!("time {} out of range", entry.time)))?;
                    insert_time.execute(params![
                        entry.id.to_string(),
                        session_id,
                        position as i64,
                        time_ms,
                        entry.scramble,
                        entry.plus_two,
                        entry.dnf,
                        entry.auto_dnf,
                        entry.favorite,
                        entry.comment,
                        entry.timestamp.timestamp_millis(),
                    ])?;
                }
            }
        }

        let settings = serde_json::to_string(&snapshot.app_settings)?;
        let kv = |key: &str, value: &str| {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
        };
        kv(KEY_APP_SETTINGS, &settings)?;
        kv(KEY_CUBE_TYPE, &snapshot.cube_type)?;
        match snapshot.current_session_id {
            Some(id) => kv(KEY_CURRENT_SESSION, &id.to_string())?,
            None => tx.execute("DELETE FROM kv WHERE key = ?1", params![KEY_CURRENT_SESSION])?,
        };
        tx.commit()?;
        info!(sessions = snapshot.sessions.len(), "snapshot saved");
        Ok(())
    }

    /// Load the stored state. `Ok(None)` if nothing was ever saved.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let Some(settings_json) = self.kv_get(KEY_APP_SETTINGS)? else {
            return Ok(None);
        };
        let app_settings: AppSettings = serde_json::from_str(&settings_json)?;
        let cube_type = self
            .kv_get(KEY_CUBE_TYPE)?
            .unwrap_or_else(|| DEFAULT_CUBE_TYPE.to_string());
        let current_session_id = self
            .kv_get(KEY_CURRENT_SESSION)?
            .map(|raw| parse_uuid("kv", &raw))
            .transpose()?;

        let mut sessions = self.load_sessions()?;
        for row in self.load_time_rows()? {
            let session_id = parse_uuid("times", &row.session_id)?;
            let entry = row.into_entry()?;
            let session = sessions
                .iter_mut()
                .find(|(s, _)| s.id == session_id)
                .ok_or_else(|| corrupt("times", format!("unknown session {session_id}")))?;
            session.1.push(entry);
        }
        let sessions = sessions
            .into_iter()
            .map(|(mut session, entries)| {
                session.times = SolveStore::from_entries(entries);
                session
            })
            .collect::<Vec<_>>();
        debug!(sessions = sessions.len(), "snapshot loaded");

        Ok(Some(Snapshot {
            sessions,
            current_session_id,
            app_settings,
            cube_type,
        }))
    }

    fn load_sessions(&self) -> Result<Vec<(Session, Vec<TimeEntry>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, cube_type, created_at FROM sessions ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, name, cube_type, created_at) = row?;
            let session = Session {
                id: parse_uuid("sessions", &id)?,
                name,
                cube_type,
                times: SolveStore::new(),
                created_at: from_millis("sessions", created_at)?,
            };
            sessions.push((session, Vec::new()));
        }
        Ok(sessions)
    }

    fn load_time_rows(&self) -> Result<Vec<TimeRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, time_ms, scramble, plus_two, dnf, auto_dnf, favorite,
                    comment, recorded_at
             FROM times
             ORDER BY session_id, position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TimeRow {
                id: row.get(0)?,
                session_id: row.get(1)?,
                time_ms: row.get(2)?,
                scramble: row.get(3)?,
                plus_two: row.get(4)?,
                dnf: row.get(5)?,
                auto_dnf: row.get(6)?,
                favorite: row.get(7)?,
                comment: row.get(8)?,
                recorded_at: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl SnapshotStore for Database {
    fn load_snapshot(&mut self) -> Result<Option<Snapshot>> {
        self.load()
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.save(snapshot)
    }
}
