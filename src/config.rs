//! Store configuration resolved from CLI flags and the environment

use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::DEFAULT_TTL;

/// Environment variable naming a directory to hold the cache database
pub const CACHE_DIR_ENV: &str = "OPENDART_CACHE_DIR";

/// Default cache directory name under the user's home directory
pub const HOME_CACHE_DIR: &str = ".opendart-mcp";

/// File name of the cache database inside the cache directory
pub const DB_FILE_NAME: &str = "cache.db";

/// Errors that can occur while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No override was given and the home directory is unknown
    #[error("Could not determine a cache directory; pass --db or set OPENDART_CACHE_DIR")]
    NoCacheDir,
}

/// Where the store lives and how long entries last by default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the SQLite database file
    pub db_path: PathBuf,
    /// TTL applied when a write does not specify one
    pub default_ttl: Duration,
}

impl StoreConfig {
    /// Resolves configuration from an explicit path, the environment, or
    /// `~/.opendart-mcp`, in that order
    ///
    /// # Arguments
    /// * `db_path` - Explicit database path (e.g. from `--db`)
    /// * `ttl_secs` - Default TTL override in seconds
    pub fn resolve(db_path: Option<&Path>, ttl_secs: Option<u64>) -> Result<Self, ConfigError> {
        let env_dir = std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from);
        Self::resolve_with(db_path, ttl_secs, env_dir, home_cache_dir())
    }

    fn resolve_with(
        db_path: Option<&Path>,
        ttl_secs: Option<u64>,
        env_dir: Option<PathBuf>,
        home_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let db_path = match db_path {
            Some(path) => path.to_path_buf(),
            None => env_dir
                .filter(|dir| !dir.as_os_str().is_empty())
                .or(home_dir)
                .map(|dir| dir.join(DB_FILE_NAME))
                .ok_or(ConfigError::NoCacheDir)?,
        };

        Ok(Self {
            db_path,
            default_ttl: ttl_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TTL),
        })
    }
}

/// `~/.opendart-mcp`, shared with the MCP server's own cache
fn home_cache_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(HOME_CACHE_DIR))
}
