//! SQLite-backed key-value persistence.
//!
//! The domain store is volatile; this is where it lands when a caller
//! explicitly flushes it, next to a handful of durable flags such as
//! `onboarding_completed` that live outside the store's slices.

use rusqlite::{params, Connection};
use std::path::Path;

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::store::StoreState;

const SNAPSHOT_KEY: &str = "store_snapshot";
const FLAG_PREFIX: &str = "flag:";

/// Durable flag marking the onboarding flow as done.
pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database in the data directory.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("mindforge.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a key. Returns whether it existed.
    pub fn kv_delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    // ── Durable flags ────────────────────────────────────────────────

    pub fn flag(&self, name: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .kv_get(&format!("{FLAG_PREFIX}{name}"))?
            .is_some_and(|v| v == "true"))
    }

    pub fn set_flag(&self, name: &str, value: bool) -> Result<(), DatabaseError> {
        self.kv_set(&format!("{FLAG_PREFIX}{name}"), if value { "true" } else { "false" })
    }

    // ── Store snapshots ──────────────────────────────────────────────

    /// Write a full store snapshot, replacing the previous one.
    pub fn save_snapshot(&self, state: &StoreState) -> Result<(), CoreError> {
        let json = serde_json::to_string(state)?;
        self.kv_set(SNAPSHOT_KEY, &json)?;
        Ok(())
    }

    /// Read the last flushed snapshot, if any.
    pub fn load_snapshot(&self) -> Result<Option<StoreState>, CoreError> {
        match self.kv_get(SNAPSHOT_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Forget the flushed snapshot. Flags are kept.
    pub fn clear_snapshot(&self) -> Result<bool, DatabaseError> {
        self.kv_delete(SNAPSHOT_KEY)
    }
}
