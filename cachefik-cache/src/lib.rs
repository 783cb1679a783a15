//! Cache-correctness primitives for a caching reverse HTTP proxy: the
//! cacheability policy, the request fingerprint builder, hop-by-hop header
//! handling, the longest-prefix route table, the bounded tee writer, and the
//! bounded LRU store itself.
//!
//! This crate has no knowledge of any particular HTTP client or server; it
//! operates on [`http::HeaderMap`] and plain strings so it can be driven from
//! any transport layer.

mod entry;
mod headers;
mod key;
mod policy;
mod route;
mod store;
mod tee;

pub use entry::CacheEntry;
pub use headers::{add_forwarded_headers, copy_headers, strip_hop_by_hop};
pub use key::build_key;
pub use policy::{can_cache_request, can_cache_response};
pub use route::{RouteTable, ServiceRoute};
pub use store::Store;
pub use tee::BoundedTee;
