use std::time::Duration;

use http::{HeaderMap, Method};

/// The default freshness lifetime assigned when a storable response carries
/// no `max-age` directive.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// A conservative subset of RFC 9111: only `no-store` on the request side is
/// honored. `public`, `must-revalidate`, `s-maxage`, `Expires`, `Vary` and
/// `Age` are deliberately ignored everywhere in this module.
pub fn can_cache_request(method: &Method, headers: &HeaderMap) -> bool {
    if method != Method::GET {
        return false;
    }

    if headers.contains_key(http::header::AUTHORIZATION) {
        return false;
    }

    if let Some(cc) = header_str(headers, http::header::CACHE_CONTROL) {
        if cc.contains("no-store") {
            return false;
        }
    }

    true
}

/// Decide whether a response is storable and for how long, from its
/// `Cache-Control` header alone.
pub fn can_cache_response(headers: &HeaderMap) -> (Duration, bool) {
    let Some(cc) = header_str(headers, http::header::CACHE_CONTROL) else {
        return (DEFAULT_TTL, true);
    };

    if cc.contains("no-store") || cc.contains("private") {
        return (Duration::ZERO, false);
    }

    for part in cc.split(',') {
        let part = part.trim();
        let Some(value) = part.strip_prefix("max-age=") else {
            continue;
        };

        return match value.parse::<i64>() {
            Ok(secs) if secs > 0 => (Duration::from_secs(secs as u64), true),
            _ => (Duration::ZERO, false),
        };
    }

    (DEFAULT_TTL, true)
}

fn header_str(headers: &HeaderMap, name: http::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
