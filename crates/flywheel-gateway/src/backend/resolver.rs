//! Backend address resolution.
//!
//! Resolution happens on every forwarded request. A backend that does not
//! exist yet (for example the application API, deployed after the gateway)
//! only fails the requests routed to it.

use crate::error::{ProxyError, ProxyResult};
use async_trait::async_trait;
use flywheel_kernel::gateway::BackendRef;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Turns a [`BackendRef`] into a socket address.
#[async_trait]
pub trait BackendResolver: Send + Sync {
    async fn resolve(&self, backend: &BackendRef) -> ProxyResult<SocketAddr>;
}

/// Resolves backends through the system resolver (cluster DNS in-cluster).
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

#[async_trait]
impl BackendResolver for DnsResolver {
    async fn resolve(&self, backend: &BackendRef) -> ProxyResult<SocketAddr> {
        let authority = backend.authority();
        let unresolvable = |reason: String| ProxyError::Unresolvable {
            backend_id: backend.id.clone(),
            authority: authority.clone(),
            reason,
        };

        let mut addrs = tokio::net::lookup_host(authority.as_str())
            .await
            .map_err(|e| unresolvable(e.to_string()))?;
        addrs
            .next()
            .ok_or_else(|| unresolvable("no addresses returned".to_string()))
    }
}

/// Fixed backend-id to address table. Unknown ids are unresolvable.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    addrs: HashMap<String, SocketAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend_id: impl Into<String>, addr: SocketAddr) -> Self {
        self.addrs.insert(backend_id.into(), addr);
        self
    }
}

#[async_trait]
impl BackendResolver for StaticResolver {
    async fn resolve(&self, backend: &BackendRef) -> ProxyResult<SocketAddr> {
        self.addrs
            .get(&backend.id)
            .copied()
            .ok_or_else(|| ProxyError::Unresolvable {
                backend_id: backend.id.clone(),
                authority: backend.authority(),
                reason: "no static address configured".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dns_resolves_localhost() {
        let backend = BackendRef::new("local", "localhost", "", 8000);
        let addr = DnsResolver.resolve(&backend).await.unwrap();
        assert_eq!(addr.port(), 8000);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn dns_failure_is_unresolvable() {
        let backend = BackendRef::new("ghost", "does-not-exist.invalid", "", 8000);
        let err = DnsResolver.resolve(&backend).await.unwrap_err();
        assert!(matches!(err, ProxyError::Unresolvable { ref backend_id, .. } if backend_id == "ghost"));
    }

    #[tokio::test]
    async fn static_resolver_uses_table() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let resolver = StaticResolver::new().with_backend("nim", addr);
        let nim = BackendRef::new("nim", "nim", "flywheel", 8000);
        assert_eq!(resolver.resolve(&nim).await.unwrap(), addr);
        let other = BackendRef::new("datastore", "ds", "flywheel", 8000);
        assert!(resolver.resolve(&other).await.is_err());
    }
}
