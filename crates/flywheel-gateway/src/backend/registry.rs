//! In-memory [`BackendRegistry`] implementation.

use flywheel_kernel::gateway::{BackendHealth, BackendRef, BackendRegistry, GatewayError};
use std::collections::HashMap;

/// [`BackendRegistry`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryBackendRegistry {
    store: HashMap<String, (BackendRef, BackendHealth)>,
}

impl InMemoryBackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendRegistry for InMemoryBackendRegistry {
    fn register(&mut self, backend: BackendRef) -> Result<(), GatewayError> {
        if self.store.contains_key(&backend.id) {
            return Err(GatewayError::DuplicateBackend(backend.id));
        }
        self.store
            .insert(backend.id.clone(), (backend, BackendHealth::Unknown));
        Ok(())
    }

    fn lookup(&self, id: &str) -> Option<&BackendRef> {
        self.store.get(id).map(|(b, _)| b)
    }

    fn list_all(&self) -> Vec<&BackendRef> {
        let mut all: Vec<_> = self.store.values().map(|(b, _)| b).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn health(&self, id: &str) -> Option<&BackendHealth> {
        self.store.get(id).map(|(_, h)| h)
    }

    fn update_health(&mut self, id: &str, health: BackendHealth) -> Result<(), GatewayError> {
        self.store
            .get_mut(id)
            .map(|(_, h)| *h = health)
            .ok_or_else(|| GatewayError::BackendNotFound(id.to_string()))
    }
}
