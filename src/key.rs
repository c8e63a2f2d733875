//! Cache key derivation for API requests

/// Builds a deterministic cache key from an endpoint and its query parameters
///
/// Parameters with no value are dropped and the rest are sorted by name, so the
/// same request always maps to the same key regardless of argument order.
///
/// # Arguments
/// * `endpoint` - Endpoint path, e.g. `/company.json`
/// * `params` - `(name, value)` pairs; `None` values are skipped
///
/// # Returns
/// `endpoint?a=1&b=2`, or just `endpoint` when no parameters remain
pub fn cache_key<I, K, V>(endpoint: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: ToString,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.as_ref().to_string(), v.to_string())))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        return endpoint.to_string();
    }

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", endpoint, query)
}
