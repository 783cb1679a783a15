use http::{HeaderMap, HeaderName, HeaderValue};

/// Headers that apply only to a single transport hop and must never be
/// forwarded by an intermediary (RFC 7230 §6.1).
pub const HOP_BY_HOP: &[HeaderName] = &[
    http::header::CONNECTION,
    http::header::PROXY_AUTHENTICATE,
    http::header::PROXY_AUTHORIZATION,
    http::header::TE,
    http::header::TRAILER,
    http::header::TRANSFER_ENCODING,
    http::header::UPGRADE,
];

/// `Proxy-Connection` and `Keep-Alive` have no typed constants in the `http`
/// crate; named explicitly alongside `HOP_BY_HOP` below.
const EXTRA_HOP_BY_HOP: &[&str] = &["proxy-connection", "keep-alive"];

/// Remove the fixed hop-by-hop header set, plus any header whose name is
/// listed as a comma-separated token in the `Connection` header.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let connection_tokens: Vec<String> = headers
        .get_all(http::header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|tok| tok.trim().to_ascii_lowercase())
        .filter(|tok| !tok.is_empty())
        .collect();

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    for name in EXTRA_HOP_BY_HOP {
        headers.remove(*name);
    }
    for token in connection_tokens {
        if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
            headers.remove(name);
        }
    }
}

/// Append every value of every header in `source` onto `destination`,
/// preserving order and multi-valued headers (never overwriting).
pub fn copy_headers(destination: &mut HeaderMap, source: &HeaderMap) {
    for (name, value) in source.iter() {
        destination.append(name.clone(), value.clone());
    }
}

/// Append `X-Forwarded-For`, and set `X-Forwarded-Proto`/`X-Forwarded-Host`,
/// on an outbound request's headers.
pub fn add_forwarded_headers(headers: &mut HeaderMap, client_ip: Option<&str>, is_tls: bool, host: &str) {
    if let Some(ip) = client_ip {
        if let Ok(value) = HeaderValue::from_str(ip) {
            headers.append(HeaderName::from_static("x-forwarded-for"), value);
        }
    }

    let proto = if is_tls { "https" } else { "http" };
    headers.insert(HeaderName::from_static("x-forwarded-proto"), HeaderValue::from_static(proto));

    if let Ok(value) = HeaderValue::from_str(host) {
        headers.insert(HeaderName::from_static("x-forwarded-host"), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fixed_hop_by_hop_set() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(http::header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key(http::header::TRANSFER_ENCODING));
        assert!(!headers.contains_key(http::header::UPGRADE));
        assert!(!headers.contains_key("keep-alive"));
        assert!(headers.contains_key(http::header::CONTENT_TYPE));
    }

    #[test]
    fn strips_headers_named_in_connection_token_list() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONNECTION, HeaderValue::from_static("close, X-Custom"));
        headers.insert("x-custom", HeaderValue::from_static("value"));

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key(http::header::CONNECTION));
        assert!(!headers.contains_key("x-custom"));
    }

    #[test]
    fn copy_headers_preserves_multi_valued() {
        let mut source = HeaderMap::new();
        source.append(http::header::SET_COOKIE, HeaderValue::from_static("a=1"));
        source.append(http::header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let mut dest = HeaderMap::new();
        copy_headers(&mut dest, &source);

        let values: Vec<_> = dest.get_all(http::header::SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn forwarded_headers_set_proto_and_host_append_for() {
        let mut headers = HeaderMap::new();
        add_forwarded_headers(&mut headers, Some("1.2.3.4"), false, "example.com");

        assert_eq!(headers.get("x-forwarded-for").unwrap(), "1.2.3.4");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "example.com");

        add_forwarded_headers(&mut headers, Some("5.6.7.8"), true, "example.com");
        let for_values: Vec<_> = headers.get_all("x-forwarded-for").iter().collect();
        assert_eq!(for_values.len(), 2);
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "https");
    }
}
