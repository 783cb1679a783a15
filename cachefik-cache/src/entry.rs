use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A stored response: status, full header map (all values of all names), the
/// buffered body, and an absolute expiry instant.
///
/// Body bytes are immutable once stored (`Bytes` is refcounted, so cloning an
/// entry never copies the buffer). Expiry is checked lazily on `Get`; there is
/// no background sweeper.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, ttl: std::time::Duration) -> Self {
        Self { status, headers, body, expires_at: Instant::now() + ttl }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
