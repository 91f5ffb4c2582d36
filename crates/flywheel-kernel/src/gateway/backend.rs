//! Backend references and the backend registry contract.
//!
//! A [`BackendRef`] names a cluster service by DNS name, namespace and port.
//! It is deliberately *not* a socket address: the gateway resolves it on
//! every request so that backends deployed after the gateway (notably the
//! application API) never block startup.

use super::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Cluster-local DNS suffix appended to `service.namespace`.
pub const CLUSTER_DOMAIN: &str = "svc.cluster.local";

// ─────────────────────────────────────────────────────────────────────────────
// Health status
// ─────────────────────────────────────────────────────────────────────────────

/// Last-known health state of a backend, as observed by the forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BackendHealth {
    /// Last request reached the backend.
    Healthy,
    /// Last request could not reach the backend.
    Unreachable(String),
    /// No request has been forwarded yet.
    #[default]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// BackendRef
// ─────────────────────────────────────────────────────────────────────────────

fn default_scheme() -> String {
    "http".to_string()
}

/// A named network service the gateway forwards requests to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendRef {
    /// Unique stable identifier referenced by route rules.
    pub id: String,
    /// Service DNS name (`df-api-service`) or a fully qualified host.
    pub service: String,
    /// Namespace the service lives in. Empty means `service` is used as-is.
    #[serde(default)]
    pub namespace: String,
    /// Service port.
    pub port: u16,
    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Optional path probed by `flywheel verify`.
    #[serde(default)]
    pub health_check_path: Option<String>,
}

impl BackendRef {
    /// Construct a backend for `service.namespace.svc.cluster.local:port`.
    pub fn new(
        id: impl Into<String>,
        service: impl Into<String>,
        namespace: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            namespace: namespace.into(),
            port,
            scheme: default_scheme(),
            health_check_path: None,
        }
    }

    /// Builder: set the health-check path.
    pub fn with_health_check(mut self, path: impl Into<String>) -> Self {
        self.health_check_path = Some(path.into());
        self
    }

    /// Builder: use https towards the backend.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// DNS host name of the backend.
    pub fn host(&self) -> String {
        if self.namespace.is_empty() {
            self.service.clone()
        } else {
            format!("{}.{}.{}", self.service, self.namespace, CLUSTER_DOMAIN)
        }
    }

    /// `host:port` authority, used for DNS lookup and the `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host(), self.port)
    }

    /// Base URL without trailing slash, e.g.
    /// `http://df-api-service.flywheel.svc.cluster.local:8000`.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.authority())
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](super::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyBackendId);
        }
        if self.service.trim().is_empty() {
            return Err(GatewayError::InvalidBackend(
                self.id.clone(),
                "service name cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(GatewayError::InvalidBackend(
                self.id.clone(),
                "port must be greater than 0".to_string(),
            ));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(GatewayError::InvalidBackend(
                self.id.clone(),
                format!("unsupported scheme '{}'", self.scheme),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry trait
// ─────────────────────────────────────────────────────────────────────────────

/// Contract for looking up backends by id and tracking their health.
pub trait BackendRegistry: Send + Sync {
    /// Register a backend. Duplicate ids are rejected.
    fn register(&mut self, backend: BackendRef) -> Result<(), GatewayError>;

    /// Look up a backend by id.
    fn lookup(&self, id: &str) -> Option<&BackendRef>;

    /// All registered backends.
    fn list_all(&self) -> Vec<&BackendRef>;

    /// Last observed health of a backend.
    fn health(&self, id: &str) -> Option<&BackendHealth>;

    /// Record the outcome of the latest forward attempt.
    fn update_health(&mut self, id: &str, health: BackendHealth) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_uses_cluster_dns() {
        let b = BackendRef::new("df-api", "df-api-service", "flywheel", 8000);
        assert_eq!(b.host(), "df-api-service.flywheel.svc.cluster.local");
        assert_eq!(
            b.base_url(),
            "http://df-api-service.flywheel.svc.cluster.local:8000"
        );
    }

    #[test]
    fn empty_namespace_uses_service_verbatim() {
        let b = BackendRef::new("local", "127.0.0.1", "", 9000);
        assert_eq!(b.authority(), "127.0.0.1:9000");
    }

    #[test]
    fn zero_port_is_invalid() {
        let b = BackendRef::new("x", "svc", "ns", 0);
        assert!(matches!(b.validate(), Err(GatewayError::InvalidBackend(ref id, _)) if id == "x"));
    }

    #[test]
    fn unknown_scheme_is_invalid() {
        let b = BackendRef::new("x", "svc", "ns", 80).with_scheme("ftp");
        assert!(b.validate().is_err());
    }
}
