//! SQLite-backed session store.
//!
//! One row per session key; a put replaces the row in a single upsert, so the
//! record is durably swapped as a unit and readers never observe a torn write.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::traits::{SessionRecord, SessionStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_key TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    transcript  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) `sessions.db` under `dir`.
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Self::open(&dir.join("sessions.db"))
    }

    /// Open a store at an explicit database path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL keeps committed puts durable across a crash without blocking reads.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<SessionRecord>, StoreError> {
        let conn = self.conn.lock();
        let row: Option<String> = conn
            .query_row(
                "SELECT transcript FROM sessions WHERE session_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match row {
            Some(json) => {
                let record: SessionRecord =
                    serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, record: &SessionRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (session_key, created_at, transcript, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_key) DO UPDATE SET
                 transcript = excluded.transcript,
                 updated_at = excluded.updated_at",
            params![key, record.created_at.to_rfc3339(), json, now],
        )?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
