//! Top-level gateway configuration and structural validation.

use super::backend::BackendRef;
use super::error::GatewayError;
use super::mock::MockRule;
use super::router::RouteRule;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_timeout_ms() -> u64 {
    30_000
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level gateway configuration.
///
/// Call [`validate()`](Self::validate) before handing the config to the
/// runtime. Once loaded the rule table is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Identifier for this gateway instance (used in logs).
    pub id: String,
    /// Proxy rules. Order in the file is irrelevant; the router sorts them.
    #[serde(default)]
    pub routes: Vec<RouteRule>,
    /// Backends referenced by the rules.
    #[serde(default)]
    pub backends: Vec<BackendRef>,
    /// Canned responses evaluated before proxy rules.
    #[serde(default)]
    pub mocks: Vec<MockRule>,
    /// Default upstream timeout in milliseconds (must be > 0).
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl GatewayConfig {
    /// Construct an empty config with only a gateway id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            routes: Vec::new(),
            backends: Vec::new(),
            mocks: Vec::new(),
            request_timeout_ms: default_timeout_ms(),
        }
    }

    /// Builder: add a route rule.
    pub fn with_route(mut self, route: RouteRule) -> Self {
        self.routes.push(route);
        self
    }

    /// Builder: add a backend.
    pub fn with_backend(mut self, backend: BackendRef) -> Self {
        self.backends.push(backend);
        self
    }

    /// Builder: add a mock rule.
    pub fn with_mock(mut self, mock: MockRule) -> Self {
        self.mocks.push(mock);
        self
    }

    /// Builder: set the default upstream timeout.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// The backend targeted by the catch-all rule, if any.
    pub fn default_backend_id(&self) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.is_catch_all())
            .map(|r| r.backend_id.as_str())
    }

    /// Validate all structural invariants of this configuration.
    ///
    /// Returns the *first* detected [`GatewayError`]. Checks, in order:
    /// 1. Gateway id is non-empty.
    /// 2. At least one route and one backend are defined.
    /// 3. `request_timeout_ms` is non-zero.
    /// 4. Backends are well-formed and uniquely named.
    /// 5. Routes are well-formed, with unique ids and unique prefixes, and
    ///    reference declared backends.
    /// 6. Exactly one route is the `/` catch-all (uniqueness follows from 5),
    ///    and it accepts every method.
    /// 7. Mock rules are well-formed and uniquely named.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyGatewayId);
        }
        if self.routes.is_empty() {
            return Err(GatewayError::NoRoutes);
        }
        if self.backends.is_empty() {
            return Err(GatewayError::NoBackends);
        }
        if self.request_timeout_ms == 0 {
            return Err(GatewayError::InvalidTimeout);
        }

        let mut backend_ids: HashSet<&str> = HashSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !backend_ids.insert(backend.id.as_str()) {
                return Err(GatewayError::DuplicateBackend(backend.id.clone()));
            }
        }

        let mut route_ids: HashSet<&str> = HashSet::new();
        let mut prefixes: HashSet<&str> = HashSet::new();
        for route in &self.routes {
            route.validate()?;
            if !route_ids.insert(route.id.as_str()) {
                return Err(GatewayError::DuplicateRoute(route.id.clone()));
            }
            if !prefixes.insert(route.path_prefix.as_str()) {
                return Err(GatewayError::DuplicatePrefix(route.path_prefix.clone()));
            }
            if route.is_catch_all() && !route.methods.is_empty() {
                return Err(GatewayError::RestrictedDefaultRoute(route.id.clone()));
            }
            if !backend_ids.contains(route.backend_id.as_str()) {
                return Err(GatewayError::UnknownBackend(
                    route.id.clone(),
                    route.backend_id.clone(),
                ));
            }
        }

        if !self.routes.iter().any(RouteRule::is_catch_all) {
            return Err(GatewayError::MissingDefaultRoute);
        }

        let mut mock_ids: HashSet<&str> = HashSet::new();
        for mock in &self.mocks {
            mock.validate()?;
            if !mock_ids.insert(mock.id.as_str()) {
                return Err(GatewayError::DuplicateMock(mock.id.clone()));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::HttpMethod;

    fn api_backend() -> BackendRef {
        BackendRef::new("df-api", "df-api-service", "flywheel", 8000)
    }

    fn datastore_backend() -> BackendRef {
        BackendRef::new("datastore", "nemodatastore-sample", "flywheel", 8000)
    }

    fn valid_config() -> GatewayConfig {
        GatewayConfig::new("gateway-test")
            .with_backend(api_backend())
            .with_backend(datastore_backend())
            .with_route(RouteRule::new("datasets", "/v1/datasets", "datastore"))
            .with_route(RouteRule::catch_all("default", "df-api"))
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
        assert_eq!(valid_config().default_backend_id(), Some("df-api"));
    }

    #[test]
    fn catch_all_with_method_restriction_returns_error() {
        let cfg = GatewayConfig::new("gw")
            .with_backend(api_backend())
            .with_route(
                RouteRule::catch_all("default", "df-api").with_methods(vec![HttpMethod::Get]),
            );
        assert_eq!(
            cfg.validate(),
            Err(GatewayError::RestrictedDefaultRoute("default".into()))
        );
    }

    #[test]
    fn whitespace_only_gateway_id_returns_error() {
        let mut cfg = valid_config();
        cfg.id = "   ".to_string();
        assert_eq!(cfg.validate(), Err(GatewayError::EmptyGatewayId));
    }

    #[test]
    fn no_routes_returns_error() {
        let cfg = GatewayConfig::new("gw").with_backend(api_backend());
        assert_eq!(cfg.validate(), Err(GatewayError::NoRoutes));
    }

    #[test]
    fn no_backends_returns_error() {
        let cfg = GatewayConfig::new("gw").with_route(RouteRule::catch_all("default", "df-api"));
        assert_eq!(cfg.validate(), Err(GatewayError::NoBackends));
    }

    #[test]
    fn missing_catch_all_returns_error() {
        let cfg = GatewayConfig::new("gw")
            .with_backend(datastore_backend())
            .with_route(RouteRule::new("datasets", "/v1/datasets", "datastore"));
        assert_eq!(cfg.validate(), Err(GatewayError::MissingDefaultRoute));
    }

    #[test]
    fn second_catch_all_is_a_duplicate_prefix() {
        let cfg = valid_config().with_route(RouteRule::catch_all("default-2", "datastore"));
        assert_eq!(
            cfg.validate(),
            Err(GatewayError::DuplicatePrefix("/".to_string()))
        );
    }

    #[test]
    fn duplicate_prefix_returns_error() {
        let cfg = valid_config().with_route(RouteRule::new("datasets-2", "/v1/datasets", "df-api"));
        assert_eq!(
            cfg.validate(),
            Err(GatewayError::DuplicatePrefix("/v1/datasets".to_string()))
        );
    }

    #[test]
    fn duplicate_route_id_returns_error() {
        let cfg = valid_config().with_route(RouteRule::new("datasets", "/v1/hf", "datastore"));
        assert_eq!(
            cfg.validate(),
            Err(GatewayError::DuplicateRoute("datasets".to_string()))
        );
    }

    #[test]
    fn route_prefix_missing_leading_slash_returns_error() {
        let cfg = valid_config().with_route(RouteRule::new("bad", "v1/evaluation", "df-api"));
        assert!(matches!(
            cfg.validate(),
            Err(GatewayError::InvalidPathPrefix(ref id, _)) if id == "bad"
        ));
    }

    #[test]
    fn route_referencing_unknown_backend_returns_error() {
        let cfg = valid_config().with_route(RouteRule::new("eval", "/v1/evaluation", "evaluator"));
        assert!(matches!(
            cfg.validate(),
            Err(GatewayError::UnknownBackend(ref rid, ref bid))
                if rid == "eval" && bid == "evaluator"
        ));
    }

    #[test]
    fn duplicate_backend_id_returns_error() {
        let cfg = valid_config().with_backend(api_backend());
        assert_eq!(
            cfg.validate(),
            Err(GatewayError::DuplicateBackend("df-api".to_string()))
        );
    }

    #[test]
    fn zero_request_timeout_returns_error() {
        let cfg = valid_config().with_timeout_ms(0);
        assert_eq!(cfg.validate(), Err(GatewayError::InvalidTimeout));
    }

    #[test]
    fn duplicate_mock_id_returns_error() {
        let cfg = valid_config()
            .with_mock(MockRule::json("m", "/v1/a", "{}"))
            .with_mock(MockRule::json("m", "/v1/b", "{}"));
        assert_eq!(cfg.validate(), Err(GatewayError::DuplicateMock("m".to_string())));
    }

    #[test]
    fn yaml_document_deserializes() {
        let yaml = r#"
id: nemo-gateway
request_timeout_ms: 5000
backends:
  - id: df-api
    service: df-api-service
    namespace: flywheel
    port: 8000
routes:
  - id: default
    path_prefix: /
    backend_id: df-api
mocks:
  - id: deployments
    path_pattern: /v1/deployment/model-deployments
    methods: [GET]
    body: '{"data":[]}'
"#;
        let cfg: GatewayConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.backends[0].scheme, "http");
        assert_eq!(cfg.mocks[0].methods, vec![crate::gateway::HttpMethod::Get]);
    }
}
