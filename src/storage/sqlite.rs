//! SQLite-backed slot store
//!
//! Keeps every slot as a row in a single `kv_slots` table so the local share
//! state survives across CLI invocations.

use super::{KeyValueStore, StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQLite handle for slot persistence
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the specified path
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::CreateDir)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockError)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_slots (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockError)?;
        let mut stmt = conn.prepare("SELECT value FROM kv_slots WHERE key = ?1")?;
        let value: Option<Vec<u8>> = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockError)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Get the default database path
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stashcode")
        .join("state.db")
}
