use url::Url;

/// A validated `(rule, upstream)` pair. `path_prefix` is the substring
/// between the backticks of `PathPrefix(\`/x\`)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRoute {
    pub path_prefix: String,
    pub upstream: Url,
}

impl ServiceRoute {
    /// Parse a raw `(rule, upstream)` candidate. Returns `None` (with a
    /// caller-visible reason via `log::warn!`) when the rule isn't of the
    /// form `PathPrefix(\`...\`)`, the upstream string is empty, or the
    /// upstream fails to parse as an absolute URL.
    pub fn parse(rule: &str, upstream: &str) -> Option<Self> {
        const PREFIX: &str = "PathPrefix(`";
        const SUFFIX: &str = "`)";

        let Some(path_prefix) = rule.strip_prefix(PREFIX).and_then(|s| s.strip_suffix(SUFFIX)) else {
            log::warn!("dropping route with malformed rule {rule:?}");
            return None;
        };

        if upstream.is_empty() {
            log::warn!("dropping route {rule:?} with empty upstream");
            return None;
        }

        let upstream = match Url::parse(upstream) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("dropping route {rule:?}: upstream {upstream:?} failed to parse: {err}");
                return None;
            }
        };

        Some(Self { path_prefix: path_prefix.to_string(), upstream })
    }
}

/// An ordered set of routes, sorted by descending `path_prefix` length so
/// the longest (most specific) match wins.
pub struct RouteTable {
    routes: Vec<ServiceRoute>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<ServiceRoute>) -> Self {
        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Self { routes }
    }

    /// Build a table from raw `(rule, upstream)` candidates, silently
    /// dropping (with a logged warning) any that fail [`ServiceRoute::parse`].
    pub fn from_candidates<I, S1, S2>(candidates: I) -> Self
    where
        I: IntoIterator<Item = (S1, S2)>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let routes = candidates
            .into_iter()
            .filter_map(|(rule, upstream)| ServiceRoute::parse(rule.as_ref(), upstream.as_ref()))
            .collect();
        Self::new(routes)
    }

    /// Return the upstream of the first route whose prefix is a string
    /// prefix of `path`. No path-segment awareness: `/api` matches `/apiary`.
    pub fn pick(&self, path: &str) -> Option<&Url> {
        self.routes.iter().find(|route| path.starts_with(route.path_prefix.as_str())).map(|route| &route.upstream)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
