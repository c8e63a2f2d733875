//! Company-code dictionary stored next to the response cache
//!
//! The dictionary is bulk-loaded once from the external code list and then
//! only read. Codes are normalized on the way in so lookups by the canonical
//! fixed-width forms always match.

use log::info;
use rusqlite::{params, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::{CacheError, CacheStore};

/// Width of a canonical company code
pub const CORP_CODE_WIDTH: usize = 8;

/// Width of a listed stock code
pub const STOCK_CODE_WIDTH: usize = 6;

/// Maximum number of records returned by a search
pub const SEARCH_LIMIT: usize = 50;

/// A single company in the dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpRecord {
    /// Unique company code, 8 digits once normalized
    #[serde(default)]
    pub corp_code: String,
    /// Registered company name
    #[serde(default)]
    pub corp_name: String,
    /// 6-digit stock code, empty for unlisted companies
    #[serde(default)]
    pub stock_code: String,
    /// Last modification date as published, not validated
    #[serde(default)]
    pub modify_date: String,
}

impl CorpRecord {
    /// Returns a copy with trimmed, zero-padded codes
    pub fn normalized(&self) -> Self {
        Self {
            corp_code: pad_code(&self.corp_code, CORP_CODE_WIDTH),
            corp_name: self.corp_name.clone(),
            stock_code: pad_code(&self.stock_code, STOCK_CODE_WIDTH),
            modify_date: self.modify_date.clone(),
        }
    }
}

/// Trims `raw` and left-pads it with `'0'` to `width`
///
/// An empty (or whitespace-only) code stays empty rather than becoming all zeros.
pub fn pad_code(raw: &str, width: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{:0>width$}", trimmed, width = width)
    }
}

impl CacheStore {
    /// Whether the dictionary holds at least one record
    pub fn has_corp_codes(&self) -> Result<bool, CacheError> {
        let exists = self.lock()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM corp_codes LIMIT 1)",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Inserts or replaces a batch of records in one transaction
    ///
    /// Either every record is written or, on error, none are and the dictionary
    /// keeps its previous contents.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records written
    /// * `Err(CacheError)` - If any statement fails; the transaction is rolled back
    pub fn insert_corp_codes(&self, records: &[CorpRecord]) -> Result<usize, CacheError> {
        let mut conn = self.lock()?;
        // Take the write lock up front so other connections wait on the busy timeout
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO corp_codes (corp_code, corp_name, stock_code, modify_date)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                let record = record.normalized();
                stmt.execute(params![
                    record.corp_code,
                    record.corp_name,
                    record.stock_code,
                    record.modify_date
                ])?;
            }
        }
        tx.commit()?;

        info!("Stored {} corp codes", records.len());
        Ok(records.len())
    }

    /// Looks up companies by name substring, exact stock code or exact corp code
    ///
    /// Name matching is case-sensitive and literal (no wildcards). Results are
    /// ordered by name and capped at [`SEARCH_LIMIT`].
    pub fn search_corp_codes(&self, query: &str) -> Result<Vec<CorpRecord>, CacheError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT corp_code, corp_name, stock_code, modify_date FROM corp_codes
             WHERE instr(corp_name, ?1) > 0 OR stock_code = ?1 OR corp_code = ?1
             ORDER BY corp_name ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![query, SEARCH_LIMIT as i64], |row| {
            Ok(CorpRecord {
                corp_code: row.get(0)?,
                corp_name: row.get(1)?,
                stock_code: row.get(2)?,
                modify_date: row.get(3)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
