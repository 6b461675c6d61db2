//! Persistent key-value store on SQLite.
//!
//! Values are opaque JSON blobs keyed by `(namespace, key)`. Each logical
//! dataset (trader state, imported candles, backtest state) gets its own
//! namespace in the same database file.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;

use crate::core::{Error, Result, Store};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            namespace: namespace.to_string(),
        })
    }

    /// Every value in this namespace in key order, deserialized as `T`.
    pub fn scan<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE namespace = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.namespace], |row| row.get::<_, Vec<u8>>(0))?;

        let mut values = Vec::new();
        for row in rows {
            let bytes = row?;
            values.push(serde_json::from_slice(&bytes)?);
        }
        Ok(values)
    }

    /// Drop every key in this namespace.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM kv WHERE namespace = ?1",
            params![self.namespace],
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn read_raw(&self, key: &str) -> Result<Vec<u8>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;

        value.ok_or_else(|| Error::Store(format!("no value for key: {key}")))
    }

    fn write_raw(&self, key: &str, value: &[u8]) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
            params![self.namespace, key, value],
        )?;
        Ok(())
    }

    fn has_data(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM kv WHERE namespace = ?1 AND key = ?2)",
            params![self.namespace, key],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }
}
