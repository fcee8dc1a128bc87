//! Persistent key-value store.
//!
//! SQLite-backed single-table store under the platform data directory.
//! Holds the serialized SIP settings and the last-dialed number.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create storage directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    #[error("malformed settings blob: {0}")]
    MalformedBlob(#[from] serde_json::Error),
}

// ============================================================================
// KV STORE
// ============================================================================

/// SQLite-backed key-value store (thread-safe through a Mutex).
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    /// Opens or creates the store in the platform data directory.
    pub fn open() -> Result<Self, StorageError> {
        let db_path = Self::default_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::open_at(&db_path)
    }

    /// Opens or creates the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        tracing::info!("Opening key-value store at {:?}", path);

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn default_path() -> Result<PathBuf, StorageError> {
        let proj_dirs =
            directories::ProjectDirs::from("org", "softphone", "softphone").ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine app data directory",
                )
            })?;

        let mut path = proj_dirs.data_dir().to_path_buf();
        path.push("softphone.db");
        Ok(path)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            [],
        )?;
        Ok(())
    }

    /// Reads a value, `None` when the key was never written.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes a value, overwriting any previous one.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO kv (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Removes a key. Removing an absent key is not an error.
    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
