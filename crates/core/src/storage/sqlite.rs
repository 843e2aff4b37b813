//! SQLite-backed key-value store.
//!
//! Uses a synchronous rusqlite connection behind a mutex; every call runs to
//! completion before returning, so callers never suspend.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStore;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension};

const SCHEMA: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     CREATE TABLE IF NOT EXISTS kv (
         key TEXT PRIMARY KEY,
         value TEXT NOT NULL
     );";

/// Quota-limited key-value store persisted in SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    quota_bytes: usize,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("quota_bytes", &self.quota_bytes).finish()
    }
}

impl SqliteStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>, quota_bytes: usize) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }
        Self::init(Connection::open(path)?, quota_bytes)
    }

    /// Open an in-memory store for testing.
    pub fn open_in_memory(quota_bytes: usize) -> Result<Self, Error> {
        Self::init(Connection::open_in_memory()?, quota_bytes)
    }

    fn init(conn: Connection, quota_bytes: usize) -> Result<Self, Error> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn), quota_bytes })
    }

    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))
    }
}

fn used_bytes(conn: &Connection, excluding: Option<&str>) -> rusqlite::Result<usize> {
    let used: i64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
         FROM kv WHERE ?1 IS NULL OR key <> ?1",
        params![excluding],
        |row| row.get(0),
    )?;
    Ok(used as usize)
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let needed = used_bytes(&tx, Some(key))? + key.len() + value.len();
        if needed > self.quota_bytes {
            return Err(Error::QuotaExceeded { key: key.to_string(), needed, quota: self.quota_bytes });
        }

        tx.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn usage_bytes(&self) -> Result<usize, Error> {
        let conn = self.lock()?;
        Ok(used_bytes(&conn, None)?)
    }
}
