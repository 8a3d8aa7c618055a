//! SQLite-backed calendar store.
//!
//! Recurring blocks are stored one row per block; each day is one row keyed
//! by its ISO date holding the JSON-encoded [`DaySchedule`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, CalendarStore};
use crate::calendar::{DaySchedule, RecurringTimeBlock};
use crate::error::{CoreError, StoreError};

/// Calendar store backed by a single SQLite file.
pub struct SqliteCalendarStore {
    conn: Mutex<Connection>,
}

impl SqliteCalendarStore {
    /// Open the store at `~/.config/blockplan/blockplan.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("blockplan.db");
        Ok(Self::open_path(&path)?)
    }

    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Locked)
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_blocks (
            id          TEXT PRIMARY KEY,
            position    INTEGER NOT NULL,
            day_of_week INTEGER NOT NULL,
            payload     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS day_schedules (
            date       TEXT PRIMARY KEY,
            payload    TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recurring_blocks_day ON recurring_blocks(day_of_week);",
    )
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, payload: &str) -> Result<T, StoreError> {
    serde_json::from_str(payload).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn encode<T: serde::Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl CalendarStore for SqliteCalendarStore {
    async fn recurring_blocks(&self) -> Result<Vec<RecurringTimeBlock>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, payload FROM recurring_blocks ORDER BY position, id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|(id, payload)| decode(&format!("recurring:{id}"), payload))
            .collect()
    }

    async fn save_recurring_blocks(&self, blocks: &[RecurringTimeBlock]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM recurring_blocks", [])?;
        for (position, block) in blocks.iter().enumerate() {
            let payload = encode(&format!("recurring:{}", block.block.id), block)?;
            tx.execute(
                "INSERT INTO recurring_blocks (id, position, day_of_week, payload)
                 VALUES (?1, ?2, ?3, ?4)",
                params![block.block.id, position as i64, block.day_of_week, payload],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn day(&self, date: NaiveDate) -> Result<DaySchedule, StoreError> {
        let key = date.to_string();
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM day_schedules WHERE date = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => decode(&key, &payload),
            None => Ok(DaySchedule::empty(date)),
        }
    }

    async fn save_day(&self, schedule: &DaySchedule) -> Result<(), StoreError> {
        let key = schedule.date.to_string();
        let payload = encode(&key, schedule)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO day_schedules (date, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(date) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            params![key, payload, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
