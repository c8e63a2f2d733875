//! Ingestion of the published company-code list
//!
//! The API distributes its company dictionary as an XML document of the form
//! `<result><list><corp_code/>…</list>…</result>`. This module turns that
//! document into [`CorpRecord`]s and loads them into the store once.

use log::info;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore, CorpRecord};
use crate::optimize::xml::{XmlError, XmlParser, TEXT_KEY};

/// Errors that can occur while importing the company-code list
#[derive(Debug, Error)]
pub enum CorpCodeError {
    /// Reading the source document failed
    #[error("Failed to read corp code file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML
    #[error("Failed to parse corp code XML: {0}")]
    Xml(#[from] XmlError),

    /// The document has no `result/list` entries
    #[error("Corp code document has no result/list entries")]
    MissingList,

    /// Storing the records failed
    #[error("Failed to store corp codes: {0}")]
    Cache(#[from] CacheError),
}

/// Parses a company-code XML document
///
/// Tag values are kept as strings; codes are padded later, on insert.
pub fn parse_corp_codes(xml: &str) -> Result<Vec<CorpRecord>, CorpCodeError> {
    let document = XmlParser::raw().parse(xml.trim())?;
    let list = document
        .get("result")
        .and_then(|result| result.get("list"))
        .ok_or(CorpCodeError::MissingList)?;

    let records = match list {
        Value::Array(items) => items.iter().map(record_from).collect(),
        item => vec![record_from(item)],
    };
    Ok(records)
}

/// Reads and parses a company-code XML file
pub fn load_corp_codes_file(path: impl AsRef<Path>) -> Result<Vec<CorpRecord>, CorpCodeError> {
    let xml = fs::read_to_string(path)?;
    parse_corp_codes(&xml)
}

/// Populates the dictionary unless it already has rows
///
/// `source` is only invoked when an import is needed, so callers can defer an
/// expensive download until it is known to be required.
///
/// # Returns
/// * `Ok(0)` if the dictionary was already populated
/// * `Ok(n)` with the number of records imported
pub fn sync_corp_codes<F>(store: &CacheStore, source: F) -> Result<usize, CorpCodeError>
where
    F: FnOnce() -> Result<String, CorpCodeError>,
{
    if store.has_corp_codes()? {
        return Ok(0);
    }

    info!("Corp code dictionary is empty, importing");
    let records = parse_corp_codes(&source()?)?;
    Ok(store.insert_corp_codes(&records)?)
}

fn record_from(item: &Value) -> CorpRecord {
    CorpRecord {
        corp_code: text_field(item, "corp_code"),
        corp_name: text_field(item, "corp_name"),
        stock_code: text_field(item, "stock_code"),
        modify_date: text_field(item, "modify_date"),
    }
}

fn text_field(item: &Value, name: &str) -> String {
    match item.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get(TEXT_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
