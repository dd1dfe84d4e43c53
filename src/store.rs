//! SQLite-backed cache of repository snapshots, user marks, and the audit
//! trail of changes and sync attempts. Data access only: no business rules.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

mod audit;
mod core_setup;
mod marks;
mod repos;

pub use self::repos::UpsertReport;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cache i/o error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

pub struct SqliteCache {
    conn: Connection,
}

/// Handle shared by the refresh worker and the UI's background tasks.
pub type SharedCache = Arc<Mutex<SqliteCache>>;

impl SqliteCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let mut cache = Self { conn };
        cache.bootstrap()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let mut cache = Self { conn };
        cache.bootstrap()?;
        Ok(cache)
    }

    pub fn into_shared(self) -> SharedCache {
        Arc::new(Mutex::new(self))
    }
}

pub fn lock(cache: &SharedCache) -> Result<MutexGuard<'_, SqliteCache>, StoreError> {
    cache
        .lock()
        .map_err(|_| StoreError::Io("cache lock poisoned".to_string()))
}

#[cfg(test)]
#[path = "tests/store/store_tests.rs"]
mod tests;
