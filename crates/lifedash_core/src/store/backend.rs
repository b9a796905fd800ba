//! Raw text persistence behind the key-value store.
//!
//! Backends move opaque JSON text; parsing and default-on-malformed
//! handling live in `KeyValueStore`.

use crate::db::{open_db, open_db_in_memory};
use crate::store::StoreResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

/// Storage contract for serialized values.
pub trait StorageBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;
    fn write(&mut self, key: &str, raw: &str) -> StoreResult<()>;
    /// Returns `false` when the key was absent.
    fn remove(&mut self, key: &str) -> StoreResult<bool>;
    /// Sorted key list.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Process-local backend; contents vanish with the store.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds raw text, bypassing serialization. Used to model corrupt data.
    pub fn with_raw(mut self, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.entries.insert(key.into(), raw.into());
        self
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, raw: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// SQLite-backed persistence over the `kv_entries` table.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Wraps a connection that already went through `open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl StorageBackend for SqliteBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }

    fn write(&mut self, key: &str, raw: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, raw],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries ORDER BY key ASC;")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}
