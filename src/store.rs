//! Key-value persistence for user preferences and bookmarks.
//!
//! Values are [`toml::Value`]s so typed records (bookmark lists) can be
//! stored without a second serialization format. [`FileStore`] keeps the
//! whole table in memory and rewrites the file on every `put`.
//!
//! Reads never fail: a missing, unreadable or corrupt file behaves like an
//! empty store. Writes report their error to the caller.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use toml::{Table, Value};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write preferences: {0}")]
    Io(#[from] io::Error),
    #[error("cannot serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }
}

fn lock(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// Volatile store, for tests and `--ephemeral` sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.table).get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        lock(&self.table).insert(key.to_string(), value);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileStore
// ─────────────────────────────────────────────────────────────────────────────

/// TOML file on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    table: Mutex<Table>,
}

impl FileStore {
    /// Opens the store. Never fails: unreadable content starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = read_table(&path);
        Self {
            path,
            table: Mutex::new(table),
        }
    }
}

fn read_table(path: &Path) -> Table {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<Table>(&content) {
            Ok(table) => {
                debug!(path = %path.display(), keys = table.len(), "Preferences loaded");
                table
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt preferences, starting empty");
                Table::new()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No preferences file yet");
            Table::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read preferences, starting empty");
            Table::new()
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.table).get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut table = lock(&self.table);
        // Only a table that reached the disk becomes visible.
        let mut next = table.clone();
        next.insert(key.to_string(), value);
        let content = toml::to_string_pretty(&next)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        *table = next;
        Ok(())
    }
}
