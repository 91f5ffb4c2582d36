//! Resource-adoption reconciler.
//!
//! Rewrites ownership metadata on leftover cluster objects so that a Helm
//! release can take them over. Never aborts: per-object and per-kind failures
//! are logged and reported in the [`AdoptionOutcome`].

use flywheel_kernel::adoption::{
    AdoptionOutcome, AdoptionPlan, ClusterApi, ClusterObject, NameFilter, ReleaseIdentity,
    ResourceKind, has_stale_field_managers,
};
use tracing::{debug, info, instrument, warn};

/// Object whose metadata does not point at the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub kind: ResourceKind,
    pub name: String,
    pub stale_field_managers: bool,
}

pub struct Reconciler<'a> {
    cluster: &'a dyn ClusterApi,
    release: ReleaseIdentity,
}

impl<'a> Reconciler<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, release: ReleaseIdentity) -> Self {
        Self { cluster, release }
    }

    pub fn release(&self) -> &ReleaseIdentity {
        &self.release
    }

    async fn matching(
        &self,
        kind: ResourceKind,
        filter: &NameFilter,
    ) -> Result<Vec<ClusterObject>, String> {
        let objects = self
            .cluster
            .list(kind, &self.release.namespace)
            .await
            .map_err(|e| e.to_string())?;
        Ok(objects
            .into_iter()
            .filter(|o| filter.matches(&o.name))
            .collect())
    }

    fn is_owned(&self, object: &ClusterObject) -> bool {
        self.release.owns(&object.annotations, &object.labels) && !has_stale_field_managers(object)
    }

    /// Adopt every object of `kind` matching `filter`.
    #[instrument(skip(self, filter), fields(release = %self.release))]
    pub async fn adopt(&self, kind: ResourceKind, filter: &NameFilter) -> AdoptionOutcome {
        let mut outcome = AdoptionOutcome::for_kind(kind);

        let objects = match self.matching(kind, filter).await {
            Ok(objects) => objects,
            Err(reason) => {
                warn!(%kind, error = %reason, "listing failed, skipping kind");
                outcome.failed.push((format!("<list {}>", kind.resource_name()), reason));
                return outcome;
            }
        };
        if objects.is_empty() {
            debug!(%kind, "no matching objects");
            return outcome;
        }

        let annotations = self.release.annotations();
        let labels = self.release.labels();

        for object in objects {
            outcome.matched.push(object.name.clone());
            if self.is_owned(&object) {
                debug!(%kind, name = %object.name, "already owned");
                outcome.already_owned.push(object.name);
                continue;
            }

            // managedFields must be cleared before the metadata write, or the
            // stale managers keep their claim on the fields we overwrite.
            let result = match self.cluster.clear_field_managers(&object).await {
                Ok(()) => {
                    self.cluster
                        .set_metadata(&object, &annotations, &labels)
                        .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    info!(%kind, name = %object.name, "adopted");
                    outcome.adopted.push(object.name);
                }
                Err(e) => {
                    warn!(%kind, name = %object.name, error = %e, "adoption failed, continuing");
                    outcome.failed.push((object.name, e.to_string()));
                }
            }
        }
        outcome
    }

    /// Report objects of `kind` matching `filter` that the release does not
    /// own. Writes nothing.
    pub async fn verify(
        &self,
        kind: ResourceKind,
        filter: &NameFilter,
    ) -> Result<Vec<Drift>, String> {
        Ok(self
            .matching(kind, filter)
            .await?
            .into_iter()
            .filter(|o| !self.is_owned(o))
            .map(|o| Drift {
                kind,
                stale_field_managers: has_stale_field_managers(&o),
                name: o.name,
            })
            .collect())
    }

    /// Run [`Reconciler::adopt`] for each target in order.
    pub async fn adopt_plan(&self, plan: &AdoptionPlan) -> Vec<AdoptionOutcome> {
        let mut outcomes = Vec::with_capacity(plan.targets.len());
        for target in &plan.targets {
            outcomes.push(self.adopt(target.kind, &target.filter).await);
        }
        outcomes
    }
}

/// Total number of failed objects across outcomes.
pub fn failure_count(outcomes: &[AdoptionOutcome]) -> usize {
    outcomes.iter().map(|o| o.failed.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::OcCluster;
    use crate::cluster::memory::MemoryCluster;
    use crate::runner::CommandOutput;
    use crate::runner::testing::ScriptedRunner;
    use std::sync::Arc;

    fn leftovers() -> MemoryCluster {
        MemoryCluster::new()
            .with_object(
                ClusterObject::new(ResourceKind::ClusterRole, "volcano-scheduler")
                    .with_annotation("meta.helm.sh/release-name", "old-nemo")
                    .with_annotation("meta.helm.sh/release-namespace", "old-ns")
                    .with_field_manager("kubectl-client-side-apply"),
            )
            .with_object(ClusterObject::new(ResourceKind::ClusterRole, "volcano-admission"))
            .with_object(ClusterObject::new(ResourceKind::ClusterRole, "cluster-admin"))
    }

    fn volcano_roles() -> NameFilter {
        NameFilter::exact(["volcano-scheduler", "volcano-admission"])
    }

    #[tokio::test]
    async fn adopts_matching_objects_only() {
        let cluster = leftovers();
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));

        let outcome = reconciler
            .adopt(ResourceKind::ClusterRole, &volcano_roles())
            .await;
        assert_eq!(outcome.adopted.len(), 2);
        assert!(outcome.is_converged());

        let role = cluster
            .object(ResourceKind::ClusterRole, "volcano-scheduler")
            .unwrap();
        assert_eq!(role.annotations["meta.helm.sh/release-name"], "nemo");
        assert_eq!(role.annotations["meta.helm.sh/release-namespace"], "flywheel");
        assert_eq!(role.labels["app.kubernetes.io/managed-by"], "Helm");
        assert_eq!(role.field_managers, vec!["kubectl-annotate", "kubectl-label"]);

        let untouched = cluster
            .object(ResourceKind::ClusterRole, "cluster-admin")
            .unwrap();
        assert!(untouched.annotations.is_empty());
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let cluster = leftovers();
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));

        let first = reconciler
            .adopt(ResourceKind::ClusterRole, &volcano_roles())
            .await;
        let after_first = cluster.object(ResourceKind::ClusterRole, "volcano-scheduler");
        let writes = cluster.write_count();

        let second = reconciler
            .adopt(ResourceKind::ClusterRole, &volcano_roles())
            .await;
        assert_eq!(
            cluster.object(ResourceKind::ClusterRole, "volcano-scheduler"),
            after_first
        );
        assert_eq!(cluster.write_count(), writes);
        assert_eq!(second.already_owned.len(), 2);
        assert_eq!(first.has_failures(), second.has_failures());
    }

    #[tokio::test]
    async fn adopted_object_from_cluster_is_left_alone() {
        let adopted = r#"{"items":[{"metadata":{
            "name": "volcano-scheduler",
            "annotations": {
                "meta.helm.sh/release-name": "nemo",
                "meta.helm.sh/release-namespace": "flywheel"
            },
            "labels": {"app.kubernetes.io/managed-by": "Helm"},
            "managedFields": [
                {"manager": "kubectl-annotate", "operation": "Update"},
                {"manager": "kubectl-label", "operation": "Update"}
            ]
        }}]}"#;
        let runner = Arc::new(ScriptedRunner::new().on("oc get", CommandOutput::ok(adopted)));
        let cluster = OcCluster::new(runner.clone(), "oc");
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));
        let filter = NameFilter::exact(["volcano-scheduler"]);

        let drift = reconciler
            .verify(ResourceKind::ClusterRole, &filter)
            .await
            .unwrap();
        assert!(drift.is_empty());

        let outcome = reconciler.adopt(ResourceKind::ClusterRole, &filter).await;
        assert_eq!(outcome.already_owned, vec!["volcano-scheduler"]);
        assert!(outcome.adopted.is_empty());
        assert!(runner.calls().iter().all(|c| c.starts_with("oc get")));
    }

    #[tokio::test]
    async fn no_match_is_noop() {
        let cluster = leftovers();
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));
        let outcome = reconciler
            .adopt(ResourceKind::ClusterRole, &NameFilter::exact(["argo-server"]))
            .await;
        assert!(outcome.is_noop());
        assert_eq!(cluster.write_count(), 0);
    }

    #[tokio::test]
    async fn continues_past_failing_object() {
        let cluster = leftovers().failing_writes("volcano-scheduler");
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));

        let outcome = reconciler
            .adopt(ResourceKind::ClusterRole, &volcano_roles())
            .await;
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "volcano-scheduler");
        assert_eq!(outcome.adopted, vec!["volcano-admission"]);
    }

    #[tokio::test]
    async fn list_failure_is_reported_and_plan_continues() {
        let cluster = leftovers().failing_list(ResourceKind::SecurityContextConstraints);
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));
        let plan = AdoptionPlan::new()
            .with_target(
                ResourceKind::SecurityContextConstraints,
                NameFilter::exact(["nemo-scc"]),
            )
            .with_target(ResourceKind::ClusterRole, volcano_roles());

        let outcomes = reconciler.adopt_plan(&plan).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].has_failures());
        assert!(outcomes[1].is_converged());
        assert_eq!(failure_count(&outcomes), 1);
    }

    #[tokio::test]
    async fn verify_reports_drift_without_writing() {
        let cluster = leftovers();
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));

        let drift = reconciler
            .verify(ResourceKind::ClusterRole, &volcano_roles())
            .await
            .unwrap();
        assert_eq!(drift.len(), 2);
        assert!(drift.iter().any(|d| d.name == "volcano-scheduler" && d.stale_field_managers));
        assert_eq!(cluster.write_count(), 0);

        reconciler
            .adopt(ResourceKind::ClusterRole, &volcano_roles())
            .await;
        let drift = reconciler
            .verify(ResourceKind::ClusterRole, &volcano_roles())
            .await
            .unwrap();
        assert!(drift.is_empty());
    }

    #[tokio::test]
    async fn fragment_filter_matches_substrings() {
        let cluster = leftovers();
        let reconciler = Reconciler::new(&cluster, ReleaseIdentity::new("nemo", "flywheel"));
        let outcome = reconciler
            .adopt(ResourceKind::ClusterRole, &NameFilter::fragments(["volcano"]))
            .await;
        assert_eq!(outcome.matched.len(), 2);
    }
}
