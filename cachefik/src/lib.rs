//! Library half of the proxy: every module the binary entry point wires
//! together, exposed so integration tests can drive a real server instance
//! against a mock backend instead of only unit-testing the pieces.

pub mod body;
pub mod client;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use cachefik_cache::{RouteTable, Store};

use crate::config::Config;
use crate::dispatcher::AppState;

/// Parse `host:port`, defaulting an empty host (`:8000`) to all interfaces
/// (`0.0.0.0:8000`), matching the reference server's bare-port listen form.
pub fn parse_addr(addr: &str) -> Result<SocketAddr, std::net::AddrParseError> {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}").parse()
    } else {
        addr.parse()
    }
}

/// Build the shared [`AppState`] from configuration and an already-resolved
/// set of `(rule, upstream)` route candidates (the caller performs discovery;
/// this function only wires the result into a route table and cache store).
pub fn build_state<I, S1, S2>(config: &Config, routes: I) -> Arc<AppState>
where
    I: IntoIterator<Item = (S1, S2)>,
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    Arc::new(AppState {
        store: Store::new(config.cache_capacity),
        route_table: RouteTable::from_candidates(routes),
        client: client::build_client(),
        proxy_timeout: config.proxy_timeout,
        max_cache_size: config.max_cache_size,
    })
}
