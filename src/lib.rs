//! Open DART local data-access layer
//!
//! Sits in front of the pay-per-call Open DART API: a SQLite-backed TTL cache
//! for raw responses, a locally synchronized company-code dictionary, and a
//! response optimizer that compacts payloads before they reach a consumer.

pub mod cache;
pub mod cli;
pub mod config;
pub mod corpcode;
pub mod key;
pub mod optimize;
