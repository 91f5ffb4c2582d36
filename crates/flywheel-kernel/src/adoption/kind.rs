//! Closed set of resource kinds the adoption reconciler knows how to handle.

use serde::{Deserialize, Serialize};

/// A cluster resource kind that may be left behind by a previous release.
///
/// Each variant knows the resource name the cluster CLI expects and whether
/// objects of the kind are namespaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    CustomResourceDefinition,
    ClusterRole,
    ClusterRoleBinding,
    RoleBinding,
    MutatingWebhookConfiguration,
    ValidatingWebhookConfiguration,
    SecurityContextConstraints,
}

impl ResourceKind {
    /// Every kind, in the order a full reconciliation visits them: CRDs
    /// first, then RBAC, then admission webhooks, then security policies.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::CustomResourceDefinition,
        ResourceKind::ClusterRole,
        ResourceKind::ClusterRoleBinding,
        ResourceKind::RoleBinding,
        ResourceKind::MutatingWebhookConfiguration,
        ResourceKind::ValidatingWebhookConfiguration,
        ResourceKind::SecurityContextConstraints,
    ];

    /// Plural resource name as accepted by `oc get` / `kubectl get`.
    pub fn resource_name(&self) -> &'static str {
        match self {
            ResourceKind::CustomResourceDefinition => "customresourcedefinitions",
            ResourceKind::ClusterRole => "clusterroles",
            ResourceKind::ClusterRoleBinding => "clusterrolebindings",
            ResourceKind::RoleBinding => "rolebindings",
            ResourceKind::MutatingWebhookConfiguration => "mutatingwebhookconfigurations",
            ResourceKind::ValidatingWebhookConfiguration => "validatingwebhookconfigurations",
            ResourceKind::SecurityContextConstraints => "securitycontextconstraints",
        }
    }

    /// The `kind` field of objects of this type.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceKind::CustomResourceDefinition => "CustomResourceDefinition",
            ResourceKind::ClusterRole => "ClusterRole",
            ResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::MutatingWebhookConfiguration => "MutatingWebhookConfiguration",
            ResourceKind::ValidatingWebhookConfiguration => "ValidatingWebhookConfiguration",
            ResourceKind::SecurityContextConstraints => "SecurityContextConstraints",
        }
    }

    /// Whether objects live inside a namespace.
    pub fn is_namespaced(&self) -> bool {
        matches!(self, ResourceKind::RoleBinding)
    }

    /// Parse a kind from its resource name, singular form or `kind` field
    /// (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        Self::ALL.into_iter().find(|k| {
            let resource = k.resource_name();
            lower == resource
                || lower == resource.trim_end_matches('s')
                || lower == k.kind_name().to_lowercase()
        })
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plural_singular_and_kind() {
        assert_eq!(ResourceKind::parse("clusterroles"), Some(ResourceKind::ClusterRole));
        assert_eq!(ResourceKind::parse("clusterrole"), Some(ResourceKind::ClusterRole));
        assert_eq!(
            ResourceKind::parse("CustomResourceDefinition"),
            Some(ResourceKind::CustomResourceDefinition)
        );
        assert_eq!(
            ResourceKind::parse("securitycontextconstraints"),
            Some(ResourceKind::SecurityContextConstraints)
        );
        assert_eq!(ResourceKind::parse("pods"), None);
    }

    #[test]
    fn only_role_bindings_are_namespaced() {
        let namespaced: Vec<_> = ResourceKind::ALL
            .into_iter()
            .filter(ResourceKind::is_namespaced)
            .collect();
        assert_eq!(namespaced, vec![ResourceKind::RoleBinding]);
    }
}
