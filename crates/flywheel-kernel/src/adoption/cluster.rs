//! Cluster access contract used by the adoption reconciler.

use super::kind::ResourceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure talking to the cluster.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdoptionError {
    /// The cluster CLI exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The cluster CLI could not be spawned at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Output from the cluster could not be decoded.
    #[error("unexpected output from `{command}`: {message}")]
    Decode { command: String, message: String },

    /// The named object does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },
}

/// Snapshot of the metadata of one cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterObject {
    pub kind: ResourceKind,
    pub name: String,
    /// Set for namespaced kinds only.
    pub namespace: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    /// Field managers recorded in `metadata.managedFields`.
    pub field_managers: Vec<String>,
}

impl ClusterObject {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
            annotations: BTreeMap::new(),
            labels: BTreeMap::new(),
            field_managers: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_field_manager(mut self, manager: impl Into<String>) -> Self {
        self.field_managers.push(manager.into());
        self
    }
}

/// Minimal cluster API the reconciler needs.
///
/// Implementations: a CLI-backed client (`oc`/`kubectl`) and an in-memory
/// cluster for tests, both in `flywheel-cli`.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List every object of `kind`. Namespaced kinds are listed in
    /// `namespace` (ignored for cluster-scoped kinds).
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<ClusterObject>, AdoptionError>;

    /// Drop `metadata.managedFields` so a later declarative update does not
    /// conflict with stale field managers.
    async fn clear_field_managers(&self, object: &ClusterObject) -> Result<(), AdoptionError>;

    /// Overwrite (not merge-if-absent) the given annotations and labels.
    async fn set_metadata(
        &self,
        object: &ClusterObject,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), AdoptionError>;
}
