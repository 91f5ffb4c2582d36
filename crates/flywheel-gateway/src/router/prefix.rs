//! Longest-prefix router implementing [`GatewayRouter`].
//!
//! Rules are kept sorted by descending prefix length, so the first rule that
//! matches is the most specific one and the `/` catch-all is always tried
//! last. Resolution is a linear scan, which is fine for the dozen or so rules
//! a gateway carries.
//!
//! A prefix matches when the request path equals it, continues with a `/`
//! segment boundary after it, or when the prefix itself ends with `/`. So
//! `/v1/models` matches `/v1/models/llama` but not `/v1/modelsx`.

use flywheel_kernel::gateway::{GatewayError, GatewayRouter, HttpMethod, RouteMatch, RouteRule};

/// [`GatewayRouter`] using most-specific-prefix-first lookup.
#[derive(Default)]
pub struct PrefixRouter {
    /// Rules sorted by descending prefix length.
    routes: Vec<RouteRule>,
}

impl PrefixRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from a rule list, rejecting duplicates.
    pub fn from_rules(rules: impl IntoIterator<Item = RouteRule>) -> Result<Self, GatewayError> {
        let mut router = Self::new();
        for rule in rules {
            router.register(rule)?;
        }
        Ok(router)
    }

    /// Whether `prefix` covers `path` (query string already stripped).
    pub fn prefix_matches(prefix: &str, path: &str) -> bool {
        if prefix.ends_with('/') {
            return path.starts_with(prefix);
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl GatewayRouter for PrefixRouter {
    fn register(&mut self, rule: RouteRule) -> Result<(), GatewayError> {
        if self.routes.iter().any(|r| r.id == rule.id) {
            return Err(GatewayError::DuplicateRoute(rule.id));
        }
        if self.routes.iter().any(|r| r.path_prefix == rule.path_prefix) {
            return Err(GatewayError::DuplicatePrefix(rule.path_prefix));
        }
        // Equal lengths keep registration order.
        let pos = self
            .routes
            .partition_point(|r| r.path_prefix.len() >= rule.path_prefix.len());
        self.routes.insert(pos, rule);
        Ok(())
    }

    fn resolve(&self, path: &str, method: &HttpMethod) -> Option<RouteMatch> {
        let path = path.split('?').next().unwrap_or(path);
        self.routes
            .iter()
            .filter(|r| r.accepts(method))
            .find(|r| Self::prefix_matches(&r.path_prefix, path))
            .map(|r| RouteMatch {
                route_id: r.id.clone(),
                backend_id: r.backend_id.clone(),
                matched_prefix: r.path_prefix.clone(),
                timeout_ms: r.timeout_ms,
            })
    }

    fn routes(&self) -> Vec<&RouteRule> {
        self.routes.iter().collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use flywheel_kernel::gateway::GatewayConfig;

    fn flywheel_router() -> PrefixRouter {
        PrefixRouter::from_rules(GatewayConfig::data_flywheel("flywheel").routes).unwrap()
    }

    #[test]
    fn datasets_route_to_datastore() {
        let m = flywheel_router()
            .resolve("/v1/datasets/foo", &HttpMethod::Get)
            .unwrap();
        assert_eq!(m.backend_id, "datastore");
        assert_eq!(m.matched_prefix, "/v1/datasets");
    }

    #[test]
    fn customization_jobs_route_to_customizer() {
        let m = flywheel_router()
            .resolve("/v1/customization/jobs", &HttpMethod::Post)
            .unwrap();
        assert_eq!(m.backend_id, "customizer");
    }

    #[test]
    fn unknown_path_routes_to_default() {
        let m = flywheel_router()
            .resolve("/unknown/path", &HttpMethod::Get)
            .unwrap();
        assert_eq!(m.backend_id, "df-api");
        assert!(m.is_default());
    }

    #[test]
    fn longer_prefix_wins_regardless_of_registration_order() {
        let mut router = PrefixRouter::new();
        router.register(RouteRule::catch_all("default", "app")).unwrap();
        router.register(RouteRule::new("v1", "/v1", "generic")).unwrap();
        router
            .register(RouteRule::new("chat", "/v1/chat/completions", "nim"))
            .unwrap();
        router.register(RouteRule::new("chat-root", "/v1/chat", "other")).unwrap();

        let m = router
            .resolve("/v1/chat/completions", &HttpMethod::Post)
            .unwrap();
        assert_eq!(m.route_id, "chat");
        let m = router.resolve("/v1/chat/other", &HttpMethod::Post).unwrap();
        assert_eq!(m.route_id, "chat-root");
        let m = router.resolve("/v1/embeddings", &HttpMethod::Post).unwrap();
        assert_eq!(m.route_id, "v1");

        let order: Vec<_> = router.routes().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order.last(), Some(&"default"));
    }

    #[test]
    fn prefix_respects_segment_boundary() {
        assert!(PrefixRouter::prefix_matches("/v1/models", "/v1/models"));
        assert!(PrefixRouter::prefix_matches("/v1/models", "/v1/models/llama"));
        assert!(!PrefixRouter::prefix_matches("/v1/models", "/v1/modelsx"));
        assert!(PrefixRouter::prefix_matches("/v1/hf/", "/v1/hf/api/repos"));
        assert!(PrefixRouter::prefix_matches("/", "/anything"));
    }

    #[test]
    fn query_string_is_ignored_for_matching() {
        let m = flywheel_router()
            .resolve("/v1/datasets?page=2", &HttpMethod::Get)
            .unwrap();
        assert_eq!(m.backend_id, "datastore");
    }

    #[test]
    fn method_filter_falls_through_to_less_specific_rule() {
        let mut router = PrefixRouter::new();
        router.register(RouteRule::catch_all("default", "app")).unwrap();
        router
            .register(RouteRule::new("jobs", "/v1/jobs", "jobs").with_methods(vec![HttpMethod::Post]))
            .unwrap();
        assert_eq!(
            router.resolve("/v1/jobs", &HttpMethod::Get).unwrap().route_id,
            "default"
        );
        assert_eq!(
            router.resolve("/v1/jobs", &HttpMethod::Post).unwrap().route_id,
            "jobs"
        );
    }

    #[test]
    fn no_catch_all_and_no_match_returns_none() {
        let router = PrefixRouter::from_rules([RouteRule::new("a", "/a", "b")]).unwrap();
        assert!(router.resolve("/z", &HttpMethod::Get).is_none());
    }

    #[test]
    fn duplicate_id_and_prefix_rejected() {
        let mut router = PrefixRouter::new();
        router.register(RouteRule::new("r1", "/a", "b")).unwrap();
        let err = router.register(RouteRule::new("r1", "/b", "b")).unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateRoute(ref id) if id == "r1"));
        let err = router.register(RouteRule::new("r2", "/a", "c")).unwrap_err();
        assert!(matches!(err, GatewayError::DuplicatePrefix(ref p) if p == "/a"));
    }
}
