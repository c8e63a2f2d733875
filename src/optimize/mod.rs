//! Response optimization for token-constrained consumers
//!
//! Shrinks API payloads in two pure stages:
//! 1. [`factor_common_fields`] lifts values repeated across every `list` item
//!    into a single `common` object.
//! 2. [`sanitize`] drops empty values and success boilerplate and expands
//!    embedded XML documents.
//!
//! Both stages are stateless and safe to call from any thread.

mod factor;
mod sanitize;
pub mod xml;

pub use factor::{factor_common_fields, COMMON_KEY, LIST_KEY};
pub use sanitize::{sanitize, SUCCESS_MESSAGE, SUCCESS_STATUS};

use serde_json::Value;

/// Factors common fields, then sanitizes the result
///
/// Returns `None` if the whole payload sanitizes away.
pub fn optimize(value: Value) -> Option<Value> {
    sanitize(factor_common_fields(value))
}
