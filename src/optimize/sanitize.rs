//! Deep sanitization of API payloads
//!
//! Strips nulls, empty strings, empty containers and the API's success
//! boilerplate, and expands string fields that hold XML documents.

use log::warn;
use serde_json::{Map, Value};

use super::xml::{parse_xml, TEXT_KEY};

/// Status code the API returns on success
pub const SUCCESS_STATUS: &str = "000";

/// Message the API pairs with [`SUCCESS_STATUS`]
pub const SUCCESS_MESSAGE: &str = "정상";

/// Recursively removes empty content from `value`
///
/// Returns `None` when nothing is left. Numbers and booleans always survive,
/// including `0` and `false`.
pub fn sanitize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => sanitize_string(&s),
        Value::Array(items) => {
            let items: Vec<Value> = items
                .into_iter()
                .filter_map(sanitize)
                .filter(|v| !is_empty_string(v))
                .collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => sanitize_object(map),
        other => Some(other),
    }
}

fn sanitize_string(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Heuristic only: anything wrapped in angle brackets is tried as XML.
    if looks_like_xml(trimmed) {
        match parse_xml(trimmed) {
            Ok(parsed) => return sanitize(parsed),
            Err(e) => warn!("Keeping XML-like string as text: {}", e),
        }
    }

    Some(Value::String(trimmed.to_string()))
}

fn sanitize_object(map: Map<String, Value>) -> Option<Value> {
    let mut sanitized = Map::new();
    for (key, value) in map {
        if is_success_marker(&key, &value) {
            continue;
        }
        if let Some(value) = sanitize(value).filter(|v| !is_empty_string(v)) {
            sanitized.insert(key, value);
        }
    }

    if sanitized.len() == 1 && sanitized.contains_key(TEXT_KEY) {
        return sanitized.remove(TEXT_KEY);
    }
    (!sanitized.is_empty()).then_some(Value::Object(sanitized))
}

fn looks_like_xml(s: &str) -> bool {
    s.starts_with('<') && s.ends_with('>')
}

fn is_success_marker(key: &str, value: &Value) -> bool {
    match key {
        "status" => value.as_str() == Some(SUCCESS_STATUS),
        "message" => value.as_str() == Some(SUCCESS_MESSAGE),
        _ => false,
    }
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}
