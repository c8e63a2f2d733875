//! Command-line interface for inspecting and maintaining the cache
//!
//! This module handles parsing of CLI arguments using clap and runs each
//! subcommand against the store or the response optimizer.

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore};
use crate::config::{ConfigError, StoreConfig};
use crate::corpcode::{load_corp_codes_file, sync_corp_codes, CorpCodeError};
use crate::key::cache_key;
use crate::optimize::optimize;

/// Error types for running CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    /// The store could not be located
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The store failed to open or execute a command
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The company-code import failed
    #[error(transparent)]
    CorpCode(#[from] CorpCodeError),

    /// Input or output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input was not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `key` parameter was not of the form NAME=VALUE
    #[error("Invalid parameter: '{0}'. Expected NAME=VALUE")]
    InvalidParam(String),
}

/// Open DART cache - inspect cached responses and the company-code dictionary
#[derive(Parser, Debug)]
#[command(name = "dartcache")]
#[command(about = "Local cache and response optimizer for the Open DART API")]
#[command(version)]
pub struct Cli {
    /// Cache database path [default: $OPENDART_CACHE_DIR/cache.db or ~/.opendart-mcp/cache.db]
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Increase log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a cached value, if present and not expired
    Get { key: String },

    /// Store a value
    Set {
        key: String,
        value: String,
        /// Time-to-live in seconds [default: 3600]
        #[arg(long, value_name = "SECS")]
        ttl: Option<u64>,
    },

    /// Remove a cached value
    Delete { key: String },

    /// Remove every expired entry
    ClearExpired,

    /// Print row counts as JSON
    Stats,

    /// Load the company-code dictionary from a CORPCODE.xml file
    ImportCorpCodes {
        file: PathBuf,
        /// Import even if the dictionary is already populated
        #[arg(long)]
        force: bool,
    },

    /// Search companies by name, stock code or corp code
    Search { query: String },

    /// Optimize a JSON payload read from FILE or stdin
    Optimize { file: Option<PathBuf> },

    /// Print the cache key for an endpoint and NAME=VALUE parameters
    Key {
        endpoint: String,
        params: Vec<String>,
    },
}

/// Maps the `-v` count to a log level
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

impl StoreConfig {
    /// Creates a StoreConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StoreConfig)` with the resolved database path and default TTL
    /// * `Err(ConfigError)` if no database location can be determined
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli.db.as_deref(), None)
    }
}

/// Runs the parsed command
///
/// # Arguments
/// * `cli` - The parsed CLI struct
/// * `input` - Source for `optimize` when no file is given
/// * `out` - Destination for command output
pub fn run<R: Read, W: Write>(cli: &Cli, mut input: R, out: &mut W) -> Result<(), CliError> {
    match &cli.command {
        Command::Optimize { file } => {
            let raw = match file {
                Some(path) => fs::read_to_string(path)?,
                None => {
                    let mut raw = String::new();
                    input.read_to_string(&mut raw)?;
                    raw
                }
            };
            let value: Value = serde_json::from_str(&raw)?;
            let optimized = optimize(value).unwrap_or(Value::Null);
            writeln!(out, "{}", serde_json::to_string(&optimized)?)?;
            return Ok(());
        }
        Command::Key { endpoint, params } => {
            let pairs = params
                .iter()
                .map(|p| {
                    p.split_once('=')
                        .map(|(k, v)| (k, Some(v)))
                        .ok_or_else(|| CliError::InvalidParam(p.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            writeln!(out, "{}", cache_key(endpoint, pairs))?;
            return Ok(());
        }
        _ => {}
    }

    let config = StoreConfig::from_cli(cli)?;
    let store = CacheStore::open(&config.db_path)?;
    run_with_store(&cli.command, &store, config.default_ttl, out)?;
    store.close()?;
    Ok(())
}

fn run_with_store<W: Write>(
    command: &Command,
    store: &CacheStore,
    default_ttl: Duration,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::Get { key } => {
            if let Some(value) = store.get(key)? {
                writeln!(out, "{}", value)?;
            }
        }
        Command::Set { key, value, ttl } => {
            let ttl = ttl.map(Duration::from_secs).unwrap_or(default_ttl);
            store.set(key, value, ttl)?;
        }
        Command::Delete { key } => store.delete(key)?,
        Command::ClearExpired => {
            let removed = store.clear_expired()?;
            writeln!(out, "Removed {} expired entries", removed)?;
        }
        Command::Stats => {
            writeln!(out, "{}", serde_json::to_string(&store.stats()?)?)?;
        }
        Command::ImportCorpCodes { file, force } => {
            let imported = if *force {
                store.insert_corp_codes(&load_corp_codes_file(file)?)?
            } else {
                sync_corp_codes(store, || Ok(fs::read_to_string(file)?))?
            };
            if imported == 0 && !*force {
                writeln!(out, "Corp code dictionary already populated (use --force to reimport)")?;
            } else {
                writeln!(out, "Imported {} corp codes", imported)?;
            }
        }
        Command::Search { query } => {
            let records = store.search_corp_codes(query)?;
            let optimized = optimize(serde_json::to_value(&records)?)
                .unwrap_or_else(|| Value::Array(Vec::new()));
            writeln!(out, "{}", serde_json::to_string(&optimized)?)?;
        }
        Command::Optimize { .. } | Command::Key { .. } => {}
    }
    Ok(())
}
