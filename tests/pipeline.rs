//! End-to-end flow as a calling layer uses it: derive a key, consult the cache,
//! store the raw payload on a miss, and optimize whatever is returned.

use std::cell::Cell;
use std::time::Duration;

use dartcache::cache::{CacheError, CacheStore};
use dartcache::corpcode::sync_corp_codes;
use dartcache::key::cache_key;
use dartcache::optimize::optimize;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Minimal stand-in for the API client's cached fetch
fn fetch(
    store: &CacheStore,
    calls: &Cell<u32>,
    corp_code: &str,
    year: Option<&str>,
) -> Result<Option<Value>, CacheError> {
    let key = cache_key("/majorstock.json", [("corp_code", Some(corp_code)), ("bsns_year", year)]);
    let raw: Value = match store.get_json(&key)? {
        Some(cached) => cached,
        None => {
            calls.set(calls.get() + 1);
            let fresh = json!({
                "status": "000",
                "message": "정상",
                "list": [
                    {"rcept_no": "20240101000001", "corp_code": corp_code, "repror": "A", "stkqy": 10},
                    {"rcept_no": "20240101000002", "corp_code": corp_code, "repror": "B", "stkqy": 0}
                ]
            });
            store.set_json(&key, &fresh, Duration::from_secs(3600))?;
            fresh
        }
    };
    Ok(optimize(raw))
}

#[test]
fn test_second_request_is_served_from_cache() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path().join("cache.db")).unwrap();
    let calls = Cell::new(0);

    let first = fetch(&store, &calls, "00126380", None).unwrap();
    let second = fetch(&store, &calls, "00126380", None).unwrap();

    assert_eq!(calls.get(), 1, "Only the first request should reach the API");
    assert_eq!(first, second);
    assert_eq!(
        first,
        Some(json!({
            "list": [
                {"rcept_no": "20240101000001", "repror": "A", "stkqy": 10},
                {"rcept_no": "20240101000002", "repror": "B", "stkqy": 0}
            ],
            "common": {"corp_code": "00126380"}
        }))
    );
}

#[test]
fn test_cache_holds_raw_payload() {
    let store = CacheStore::open_in_memory().unwrap();
    let calls = Cell::new(0);

    fetch(&store, &calls, "00126380", Some("2023")).unwrap();

    let raw = store
        .get("/majorstock.json?bsns_year=2023&corp_code=00126380")
        .unwrap()
        .expect("Raw payload should be cached under the derived key");
    let raw: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(raw["status"], "000", "Cached value must not be optimized");
}

#[test]
fn test_distinct_params_use_distinct_entries() {
    let store = CacheStore::open_in_memory().unwrap();
    let calls = Cell::new(0);

    fetch(&store, &calls, "00126380", Some("2023")).unwrap();
    fetch(&store, &calls, "00126380", Some("2024")).unwrap();
    fetch(&store, &calls, "00126380", Some("2023")).unwrap();

    assert_eq!(calls.get(), 2);
}

#[test]
fn test_dictionary_survives_restart_and_skips_reimport() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.db");
    let xml = "<result><list><corp_code>164742</corp_code><corp_name>현대자동차</corp_name>\
               <stock_code>5380</stock_code><modify_date>20230101</modify_date></list></result>";

    let store = CacheStore::open(&path).unwrap();
    assert_eq!(sync_corp_codes(&store, || Ok(xml.to_string())).unwrap(), 1);
    store.close().unwrap();

    let store = CacheStore::open(&path).unwrap();
    let imported = sync_corp_codes(&store, || panic!("Source should not be read again")).unwrap();
    assert_eq!(imported, 0);

    let results = store.search_corp_codes("005380").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].corp_code, "00164742");
    assert_eq!(results[0].corp_name, "현대자동차");
}
