use std::num::NonZeroUsize;
use std::time::Duration;

/// Process configuration, loaded once at startup from `CACHEFIK_*`
/// environment variables and never mutated afterward.
///
/// Any variable that is set but fails to parse falls back to its documented
/// default rather than aborting startup, matching the "ignore and use
/// fallback" behavior of the reference configuration loader, not a
/// fail-fast one.
#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub proxy_timeout: Duration,
    pub max_cache_size: usize,
    pub cache_capacity: NonZeroUsize,
    pub docker_host: String,
    pub docker_version: String,
    pub log_level: String,
}

const DEFAULT_CACHE_CAPACITY: usize = 1000;

impl Config {
    pub fn load() -> Self {
        Self::from_env(|key| std::env::var(key).ok())
    }

    fn from_env(getenv: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            addr: string_var(&getenv, "CACHEFIK_ADDR", ":8000"),
            read_timeout: duration_var(&getenv, "CACHEFIK_READ_TIMEOUT", Duration::from_secs(5)),
            write_timeout: duration_var(&getenv, "CACHEFIK_WRITE_TIMEOUT", Duration::from_secs(10)),
            proxy_timeout: duration_var(&getenv, "CACHEFIK_PROXY_TIMEOUT", Duration::from_secs(10)),
            max_cache_size: usize_var(&getenv, "CACHEFIK_MAX_CACHE_SIZE", 10 * 1024 * 1024),
            cache_capacity: NonZeroUsize::new(usize_var(&getenv, "CACHEFIK_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY))
                .unwrap_or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap()),
            docker_host: string_var(&getenv, "CACHEFIK_DOCKER_HOST", ""),
            docker_version: string_var(&getenv, "CACHEFIK_DOCKER_VERSION", ""),
            log_level: string_var(&getenv, "CACHEFIK_LOG_LEVEL", "info"),
        }
    }
}

fn string_var(getenv: impl Fn(&str) -> Option<String>, key: &str, fallback: &str) -> String {
    getenv(key).unwrap_or_else(|| fallback.to_string())
}

fn duration_var(getenv: impl Fn(&str) -> Option<String>, key: &str, fallback: Duration) -> Duration {
    match getenv(key) {
        None => fallback,
        Some(value) => humantime::parse_duration(&value).unwrap_or_else(|err| {
            log::warn!("{key}={value:?} is not a valid duration ({err}), using default {fallback:?}");
            fallback
        }),
    }
}

fn usize_var(getenv: impl Fn(&str) -> Option<String>, key: &str, fallback: usize) -> usize {
    match getenv(key) {
        None => fallback,
        Some(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("{key}={value:?} is not a valid integer, using default {fallback}");
            fallback
        }),
    }
}
