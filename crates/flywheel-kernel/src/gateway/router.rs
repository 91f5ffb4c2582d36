//! Gateway router trait and route rule configuration.
//!
//! The [`GatewayRouter`] trait is the single abstraction for request routing.
//! Implementations (e.g. the prefix router in `flywheel-gateway`) are loaded
//! with [`RouteRule`]s at startup and queried on every inbound request.

use super::error::GatewayError;
use super::types::{HttpMethod, RouteMatch};
use serde::{Deserialize, Serialize};

/// Path prefix of the catch-all default rule.
pub const CATCH_ALL_PREFIX: &str = "/";

// ─────────────────────────────────────────────────────────────────────────────
// Route rule
// ─────────────────────────────────────────────────────────────────────────────

/// A single routing rule mapping a path prefix (+ optional method set) to a
/// backend.
///
/// ```text
/// /v1/datasets        — matches /v1/datasets, /v1/datasets/foo, /v1/datasets?x=1
/// /v1/hf/             — trailing slash: plain string prefix
/// /                   — catch-all default
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteRule {
    /// Unique stable identifier for this rule.
    pub id: String,
    /// Path prefix. Must begin with `/`.
    pub path_prefix: String,
    /// Id of the backend this rule forwards to.
    pub backend_id: String,
    /// Accepted HTTP methods. Empty means *all* methods are accepted.
    #[serde(default)]
    pub methods: Vec<HttpMethod>,
    /// Per-rule request timeout in milliseconds. `0` means "use the gateway
    /// default".
    #[serde(default)]
    pub timeout_ms: u64,
}

impl RouteRule {
    /// Create a rule with just id, prefix and backend.
    pub fn new(
        id: impl Into<String>,
        path_prefix: impl Into<String>,
        backend_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path_prefix: path_prefix.into(),
            backend_id: backend_id.into(),
            methods: Vec::new(),
            timeout_ms: 0,
        }
    }

    /// Catch-all rule forwarding every unmatched path to `backend_id`.
    pub fn catch_all(id: impl Into<String>, backend_id: impl Into<String>) -> Self {
        Self::new(id, CATCH_ALL_PREFIX, backend_id)
    }

    /// Builder: restrict to specific HTTP methods.
    pub fn with_methods(mut self, methods: Vec<HttpMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Builder: set a per-rule timeout.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// True for the `/` default rule.
    pub fn is_catch_all(&self) -> bool {
        self.path_prefix == CATCH_ALL_PREFIX
    }

    /// Whether this rule accepts `method`.
    pub fn accepts(&self, method: &HttpMethod) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](super::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyRouteId);
        }
        if !self.path_prefix.starts_with('/') {
            return Err(GatewayError::InvalidPathPrefix(
                self.id.clone(),
                "path prefix must start with '/'".to_string(),
            ));
        }
        if self.path_prefix.contains('?') || self.path_prefix.contains(char::is_whitespace) {
            return Err(GatewayError::InvalidPathPrefix(
                self.id.clone(),
                "path prefix cannot contain '?' or whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router trait
// ─────────────────────────────────────────────────────────────────────────────

/// Contract for request routing.
///
/// Lookups are synchronous: no I/O happens during route resolution. Backend
/// addresses are resolved later, by the forwarder, at request time.
pub trait GatewayRouter: Send + Sync {
    /// Register a new rule. Returns [`GatewayError::DuplicateRoute`] if a rule
    /// with the same `id` exists and [`GatewayError::DuplicatePrefix`] if the
    /// prefix is already claimed.
    fn register(&mut self, rule: RouteRule) -> Result<(), GatewayError>;

    /// Resolve a request `(path, method)` to the most specific matching rule.
    /// Returns `None` only when not even a catch-all accepts the request.
    fn resolve(&self, path: &str, method: &HttpMethod) -> Option<RouteMatch>;

    /// Snapshot of all registered rules in evaluation order.
    fn routes(&self) -> Vec<&RouteRule>;
}
