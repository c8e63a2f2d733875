//! SQLite-backed TTL cache for raw API responses
//!
//! Provides a `CacheStore` that keeps serialized API payloads in a local SQLite
//! file together with an absolute expiry timestamp. Expired rows are never
//! returned: `get` deletes them on access, and `clear_expired` sweeps the rest.

use chrono::Utc;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Time-to-live used when the caller does not supply one
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// How long a statement waits on a lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cache (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cache_expires_at ON cache(expires_at);
    CREATE TABLE IF NOT EXISTS corp_codes (
        corp_code TEXT PRIMARY KEY,
        corp_name TEXT NOT NULL,
        stock_code TEXT NOT NULL,
        modify_date TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_corp_codes_stock_code ON corp_codes(stock_code);
";

/// Errors that can occur when opening or using the cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// The directory holding the database could not be created
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite reported an error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A cached payload could not be (de)serialized
    #[error("Failed to serialize cached value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another thread panicked while holding the connection
    #[error("Cache connection lock poisoned")]
    LockPoisoned,
}

/// Row counts reported by [`CacheStore::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Rows in the response cache, live or stale
    pub entries: u64,
    /// Rows whose TTL has elapsed but which have not been swept yet
    pub expired: u64,
    /// Rows in the company-code dictionary
    pub corp_codes: u64,
}

/// Durable key/value cache plus company-code dictionary
///
/// A store exclusively owns one SQLite connection. All statements go through an
/// internal mutex, so a `&CacheStore` can be shared between threads; other
/// processes using the same file are serialized by SQLite's own locking.
#[derive(Debug)]
pub struct CacheStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Opens (or creates) the cache database at `path`
    ///
    /// Missing parent directories are created. Schema creation is idempotent, so
    /// the same file can be reopened across process restarts.
    ///
    /// # Returns
    /// * `Ok(CacheStore)` ready for use
    /// * `Err(CacheError)` if the directory, file or schema cannot be created
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| CacheError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Opened cache at {} (journal_mode={})", path.display(), mode);

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory store, discarded when dropped
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the connection, reporting any error SQLite raises while doing so
    pub fn close(self) -> Result<(), CacheError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| CacheError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| CacheError::Sqlite(e))
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Reads a cached value
    ///
    /// Returns `None` if the key was never set or its TTL has elapsed. A stale row
    /// is deleted as a side effect.
    pub fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.lock()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((value, expires_at)) = row else {
            debug!("Cache miss for {}", key);
            return Ok(None);
        };

        if now_millis() > expires_at {
            debug!("Cache entry for {} expired, evicting", key);
            conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
            return Ok(None);
        }

        debug!("Cache hit for {}", key);
        Ok(Some(value))
    }

    /// Writes a value with the given time-to-live
    ///
    /// An existing entry under the same key is replaced outright, TTL included.
    ///
    /// # Arguments
    /// * `key` - Cache key, usually built with [`crate::key::cache_key`]
    /// * `value` - Payload stored verbatim
    /// * `ttl` - How long the entry stays readable
    pub fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = expiry_from_now(ttl);
        self.lock()?.execute(
            "INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    /// Writes a value using [`DEFAULT_TTL`]
    pub fn set_default(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.set(key, value, DEFAULT_TTL)
    }

    /// Removes an entry; removing a missing key is not an error
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?
            .execute("DELETE FROM cache WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Deletes every entry whose TTL has elapsed and returns how many were removed
    pub fn clear_expired(&self) -> Result<usize, CacheError> {
        let removed = self.lock()?.execute(
            "DELETE FROM cache WHERE expires_at <= ?1",
            params![now_millis()],
        )?;
        if removed > 0 {
            log::info!("Swept {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Reads a cached JSON payload and deserializes it
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes `data` to JSON and caches it
    pub fn set_json<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<(), CacheError> {
        let raw = serde_json::to_string(data)?;
        self.set(key, &raw, ttl)
    }

    /// Counts cache and dictionary rows
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.lock()?;
        let (entries, expired): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(expires_at <= ?1), 0) FROM cache",
            params![now_millis()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let corp_codes: i64 =
            conn.query_row("SELECT COUNT(*) FROM corp_codes", [], |row| row.get(0))?;

        Ok(CacheStats {
            entries: entries.max(0) as u64,
            expired: expired.max(0) as u64,
            corp_codes: corp_codes.max(0) as u64,
        })
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_from_now(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl_ms)
}
