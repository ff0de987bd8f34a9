//! Durable key/value slots for local share state.
//!
//! Each slot holds one opaque byte blob that is always overwritten whole.
//! The share registry and the download-link cache each own one slot.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

mod sqlite;

pub use sqlite::{default_db_path, SqliteStore};

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create storage directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to encode slot value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to acquire lock")]
    LockError,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A store of named byte slots.
///
/// Writes replace the whole slot; there are no partial updates.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot, `None` if it was never written.
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Overwrite a slot.
    fn write(&self, key: &str, value: &[u8]) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).write(key, value)
    }
}

/// In-memory store, used by tests and as a throwaway backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot with raw bytes (e.g. a corrupt payload in tests).
    pub fn with_slot(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.lock() {
            slots.insert(key.to_string(), value.into());
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let slots = self.slots.lock().map_err(|_| StorageError::LockError)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::LockError)?;
        slots.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
