//! Durable cache for API responses and the company-code dictionary
//!
//! This module provides a SQLite-backed store with two tables: a TTL key/value
//! cache holding raw API payloads verbatim, and a bulk-loaded dictionary of
//! company codes searchable by name, stock code or corp code. Staleness is
//! detected lazily on read; no background timer is involved.

mod dictionary;
mod store;

pub use dictionary::{pad_code, CorpRecord, CORP_CODE_WIDTH, SEARCH_LIMIT, STOCK_CODE_WIDTH};
pub use store::{CacheError, CacheStats, CacheStore, DEFAULT_TTL};
