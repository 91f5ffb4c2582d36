//! Resource-adoption contract.
//!
//! Before a Helm release is installed, cluster-scoped objects left behind by
//! an earlier install (possibly under another release name) must be
//! re-labelled so Helm will manage them instead of refusing to install. The
//! reconciler that does this lives in `flywheel-cli`; this module holds the
//! types it is built from:
//!
//! - [`ResourceKind`]: the closed set of kinds that can be adopted.
//! - [`NameFilter`]: which objects of a kind to adopt.
//! - [`ReleaseIdentity`]: the ownership the objects should end up with.
//! - [`ClusterApi`]: list / clear field managers / overwrite metadata.
//! - [`AdoptionOutcome`], [`AdoptionPlan`].

pub mod cluster;
pub mod filter;
pub mod kind;
pub mod ownership;
pub mod plan;

pub use cluster::{AdoptionError, ClusterApi, ClusterObject};
pub use filter::NameFilter;
pub use kind::ResourceKind;
pub use ownership::{
    MANAGED_BY_HELM, MANAGED_BY_LABEL, RELEASE_NAME_ANNOTATION, RELEASE_NAMESPACE_ANNOTATION,
    ReleaseIdentity,
};
pub use plan::{ANYUID_ROLE_BINDING, AdoptionOutcome, AdoptionPlan, AdoptionTarget};

/// Manager the API server records for `annotate` writes.
pub const ANNOTATE_FIELD_MANAGER: &str = "kubectl-annotate";
/// Manager the API server records for `label` writes.
pub const LABEL_FIELD_MANAGER: &str = "kubectl-label";

/// Field managers that do not block a Helm upgrade: Helm itself and the
/// metadata writes adoption leaves behind.
pub const BENIGN_FIELD_MANAGERS: &[&str] = &["helm", ANNOTATE_FIELD_MANAGER, LABEL_FIELD_MANAGER];

/// Whether `object` carries field managers that would conflict with a Helm
/// update.
pub fn has_stale_field_managers(object: &ClusterObject) -> bool {
    object
        .field_managers
        .iter()
        .any(|m| !BENIGN_FIELD_MANAGERS.contains(&m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adoption_writes_are_not_stale() {
        let adopted = ClusterObject::new(ResourceKind::ClusterRole, "volcano-scheduler")
            .with_field_manager("helm")
            .with_field_manager(ANNOTATE_FIELD_MANAGER)
            .with_field_manager(LABEL_FIELD_MANAGER);
        assert!(!has_stale_field_managers(&adopted));

        let applied = adopted.with_field_manager("kubectl-client-side-apply");
        assert!(has_stale_field_managers(&applied));
    }
}
