use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cachefik_cache::{
    add_forwarded_headers, build_key, can_cache_request, can_cache_response, strip_hop_by_hop, BoundedTee,
    CacheEntry, RouteTable, Store,
};
use http::{HeaderValue, Request, Response};
use http_body_util::BodyExt;
use hyper::body::Incoming;

use crate::body::{full, ResponseBody, TeeBody};
use crate::client::HttpClient;
use crate::error::AppError;

/// Everything the dispatcher needs, shared read-only (or internally
/// synchronized) across every in-flight request.
pub struct AppState {
    pub store: Store,
    pub route_table: RouteTable,
    pub client: HttpClient,
    pub proxy_timeout: Duration,
    pub max_cache_size: usize,
}

/// The per-request state machine: cache lookup, route, clone+rewrite,
/// upstream fetch, stream, conditional install.
pub async fn dispatch(state: Arc<AppState>, req: Request<Incoming>, remote_addr: SocketAddr) -> Response<ResponseBody> {
    let method = req.method().clone();
    let headers = req.headers().clone();
    let uri = req.uri().clone();

    let host = headers.get(http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
    let scheme = "http"; // upstream connections are plain HTTP; no inbound TLS termination
    let path = uri.path().to_string();
    let raw_query = uri.query().unwrap_or("").to_string();

    let key = build_key(&method, scheme, &host, &path, &raw_query);

    if can_cache_request(&method, &headers) {
        if let Some(entry) = state.store.get(&key) {
            return respond_from_cache(entry);
        }
    }

    let upstream = match state.route_table.pick(&path) {
        Some(url) => url.clone(),
        None => {
            log::warn!("no upstream found for {path}");
            return AppError::NoRoute.into_response();
        }
    };

    let outbound = match build_outbound_request(req, &upstream, remote_addr) {
        Ok(outbound) => outbound,
        Err(response) => return response,
    };

    let upstream_call = state.client.request(outbound);
    let upstream_response = match tokio::time::timeout(state.proxy_timeout, upstream_call).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            log::error!("upstream error calling {upstream}: {err}");
            return AppError::Upstream(Box::new(err)).into_response();
        }
        Err(_elapsed) => {
            log::error!("upstream error calling {upstream}: timed out after {:?}", state.proxy_timeout);
            let timeout_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "proxy timeout exceeded");
            return AppError::Upstream(Box::new(timeout_err)).into_response();
        }
    };

    let (parts, upstream_body) = upstream_response.into_parts();
    let status = parts.status;
    let mut response_headers = parts.headers;
    strip_hop_by_hop(&mut response_headers);

    let (ttl, storable) = can_cache_response(&response_headers);
    let can_cache = storable && can_cache_request(&method, &headers);

    // Snapshot the headers as they'll be stored, before stamping the
    // X-Cache marker that only belongs on the live response.
    let headers_for_entry = response_headers.clone();
    response_headers.insert("x-cache", HeaderValue::from_static(if can_cache { "MISS" } else { "BYPASS" }));

    let body: ResponseBody = if can_cache {
        let tee = BoundedTee::new(state.max_cache_size);
        let upstream_body = upstream_body.map_err(std::io::Error::other);
        let store_for_install = Arc::clone(&state);
        TeeBody::new(upstream_body, tee, move |buffered, exceeded| {
            if exceeded {
                log::debug!("cache-oversize for {key}, serving full response but not storing");
                return;
            }
            store_for_install.store.set(key, CacheEntry::new(status, headers_for_entry, buffered, ttl));
        })
        .boxed()
    } else {
        upstream_body.map_err(std::io::Error::other).boxed()
    };

    let mut response = Response::builder().status(status).body(body).expect("status copied from a valid response");
    *response.headers_mut() = response_headers;
    response
}

fn respond_from_cache(entry: CacheEntry) -> Response<ResponseBody> {
    let mut headers = entry.headers.clone();
    headers.insert("x-cache", HeaderValue::from_static("HIT"));

    let mut response =
        Response::builder().status(entry.status).body(full(entry.body)).expect("status copied from a stored entry");
    *response.headers_mut() = headers;
    response
}

/// Deep-copy the inbound request, retarget it at `upstream`, strip
/// hop-by-hop headers and add the forwarded-header set. The inbound `Host`
/// header is left untouched so the upstream receives the original `Host`,
/// not its own authority.
fn build_outbound_request(
    req: Request<Incoming>,
    upstream: &url::Url,
    remote_addr: SocketAddr,
) -> Result<Request<Incoming>, Response<ResponseBody>> {
    let (mut parts, body) = req.into_parts();

    let joined_path = single_joining_slash(upstream.path(), parts.uri.path());
    let path_and_query = match parts.uri.query() {
        Some(query) if !query.is_empty() => format!("{joined_path}?{query}"),
        _ => joined_path,
    };

    let authority = match upstream.port() {
        Some(port) => format!("{}:{port}", upstream.host_str().unwrap_or_default()),
        None => upstream.host_str().unwrap_or_default().to_string(),
    };

    let new_uri = http::Uri::builder()
        .scheme(upstream.scheme())
        .authority(authority)
        .path_and_query(path_and_query)
        .build();

    match new_uri {
        Ok(uri) => parts.uri = uri,
        Err(err) => {
            log::error!("failed to build outbound URI for upstream {upstream}: {err}");
            return Err(AppError::Upstream(Box::new(err)).into_response());
        }
    }

    let inbound_host = parts.headers.get(http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();

    strip_hop_by_hop(&mut parts.headers);
    add_forwarded_headers(&mut parts.headers, Some(&remote_addr.ip().to_string()), false, &inbound_host);

    Ok(Request::from_parts(parts, body))
}

/// Join two path segments with exactly one `/` at the boundary, matching
/// the standard reverse-proxy join: `/a/` + `/b` -> `/a/b`, `/a` + `b` ->
/// `/a/b`, any other combination concatenates as-is.
fn single_joining_slash(a: &str, b: &str) -> String {
    let a_slash = a.ends_with('/');
    let b_slash = b.starts_with('/');

    match (a_slash, b_slash) {
        (true, true) => format!("{a}{}", &b[1..]),
        (false, false) => format!("{a}/{b}"),
        _ => format!("{a}{b}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_exactly_one_slash_regardless_of_input() {
        assert_eq!(single_joining_slash("/a/", "/b"), "/a/b");
        assert_eq!(single_joining_slash("/a", "b"), "/a/b");
        assert_eq!(single_joining_slash("/a/", "b"), "/a/b");
        assert_eq!(single_joining_slash("/a", "/b"), "/a/b");
    }
}
