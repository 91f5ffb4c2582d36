//! Helm release ownership metadata.
//!
//! Helm refuses to install a chart over an existing object unless the object
//! carries the release's ownership annotations and the `managed-by` label.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation naming the owning release.
pub const RELEASE_NAME_ANNOTATION: &str = "meta.helm.sh/release-name";
/// Annotation naming the owning release's namespace.
pub const RELEASE_NAMESPACE_ANNOTATION: &str = "meta.helm.sh/release-namespace";
/// Label marking the object as Helm-managed.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of [`MANAGED_BY_LABEL`] for Helm releases.
pub const MANAGED_BY_HELM: &str = "Helm";

/// The release that should own adopted objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseIdentity {
    /// Helm release name.
    pub name: String,
    /// Namespace the release is installed into.
    pub namespace: String,
}

impl ReleaseIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Annotations an owned object must carry.
    pub fn annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (RELEASE_NAME_ANNOTATION.to_string(), self.name.clone()),
            (RELEASE_NAMESPACE_ANNOTATION.to_string(), self.namespace.clone()),
        ])
    }

    /// Labels an owned object must carry.
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY_HELM.to_string())])
    }

    /// Whether the given metadata already points at this release.
    pub fn owns(
        &self,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> bool {
        self.annotations()
            .iter()
            .all(|(k, v)| annotations.get(k) == Some(v))
            && self.labels().iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl std::fmt::Display for ReleaseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owns_requires_every_key() {
        let release = ReleaseIdentity::new("nemo", "flywheel");
        let mut annotations = release.annotations();
        let labels = release.labels();
        assert!(release.owns(&annotations, &labels));

        annotations.insert(RELEASE_NAMESPACE_ANNOTATION.to_string(), "other".to_string());
        assert!(!release.owns(&annotations, &labels));
        assert!(!release.owns(&release.annotations(), &BTreeMap::new()));
    }

    #[test]
    fn extra_metadata_does_not_break_ownership() {
        let release = ReleaseIdentity::new("nemo", "flywheel");
        let mut labels = release.labels();
        labels.insert("app".to_string(), "volcano".to_string());
        assert!(release.owns(&release.annotations(), &labels));
    }
}
