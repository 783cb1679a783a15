use http::Method;

/// Build the canonical cache fingerprint `METHOD:scheme://host/path?raw-query`.
///
/// `raw_query` is taken byte-for-byte from the inbound URL: not re-encoded,
/// not sorted. When the query is empty the key still ends with `?`.
pub fn build_key(method: &Method, scheme: &str, host: &str, path: &str, raw_query: &str) -> String {
    format!("{method}:{scheme}://{host}{path}?{raw_query}")
}
