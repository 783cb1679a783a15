//! Process entry point: initialize logging, load configuration, run one-shot
//! service discovery, build the route table and cache store, then serve
//! until a termination signal arrives.

use std::net::SocketAddr;
use std::process::ExitCode;

use cachefik::config::Config;
use cachefik::{build_state, discovery, parse_addr, server};

fn main() -> ExitCode {
    let config = Config::load();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level)).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(config))
}

async fn run(config: Config) -> ExitCode {
    log::info!(
        "starting cachefik: addr={} read_timeout={:?} write_timeout={:?} proxy_timeout={:?} max_cache_size={} cache_capacity={}",
        config.addr,
        config.read_timeout,
        config.write_timeout,
        config.proxy_timeout,
        config.max_cache_size,
        config.cache_capacity,
    );

    let discovered = match discovery::discover_services(&config.docker_host, &config.docker_version).await {
        Ok(services) => services,
        Err(err) => {
            log::error!("service discovery failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let route_count = discovered.len();
    let state = build_state(&config, discovered.into_iter().map(|s| (s.rule, s.upstream)));
    log::info!("discovered {route_count} candidate route(s), {} active after validation", state.route_table.len());

    let addr: SocketAddr = match parse_addr(&config.addr) {
        Ok(addr) => addr,
        Err(err) => {
            log::error!("failed to parse listen address {:?}: {err}", config.addr);
            return ExitCode::FAILURE;
        }
    };

    match server::serve(addr, state, config.read_timeout, config.write_timeout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("failed to bind listener on {}: {err}", config.addr);
            ExitCode::FAILURE
        }
    }
}
