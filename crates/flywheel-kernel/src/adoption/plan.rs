//! Adoption outcomes and plans.

use super::filter::NameFilter;
use super::kind::ResourceKind;
use serde::{Deserialize, Serialize};

/// Namespace binding `oc adm policy add-scc-to-user anyuid` creates.
pub const ANYUID_ROLE_BINDING: &str = "system:openshift:scc:anyuid";

/// Result of adopting one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionOutcome {
    pub kind: Option<ResourceKind>,
    /// Names that matched the filter.
    pub matched: Vec<String>,
    /// Names whose ownership was rewritten by this run.
    pub adopted: Vec<String>,
    /// Names that already belonged to the release; nothing was written.
    pub already_owned: Vec<String>,
    /// `(name, reason)` for every object that could not be adopted.
    pub failed: Vec<(String, String)>,
}

impl AdoptionOutcome {
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// True when nothing matched the filter.
    pub fn is_noop(&self) -> bool {
        self.matched.is_empty() && self.failed.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Every matched object now belongs to the release.
    pub fn is_converged(&self) -> bool {
        self.failed.is_empty() && self.adopted.len() + self.already_owned.len() == self.matched.len()
    }
}

/// One step of an [`AdoptionPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionTarget {
    pub kind: ResourceKind,
    pub filter: NameFilter,
}

/// Ordered list of kinds and name filters, visited sequentially.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionPlan {
    pub targets: Vec<AdoptionTarget>,
}

impl AdoptionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, kind: ResourceKind, filter: NameFilter) -> Self {
        self.targets.push(AdoptionTarget { kind, filter });
        self
    }

    /// Split into `(matching, rest)` by object name. Exact filters are split
    /// name by name; fragment filters stay in `rest`. Targets left with an
    /// empty filter are dropped.
    pub fn partition(&self, pred: impl Fn(&str) -> bool) -> (AdoptionPlan, AdoptionPlan) {
        let mut matching = AdoptionPlan::new();
        let mut rest = AdoptionPlan::new();
        for target in &self.targets {
            match &target.filter {
                NameFilter::Exact(names) => {
                    let (yes, no): (Vec<&String>, Vec<&String>) =
                        names.iter().partition(|n| pred(n.as_str()));
                    if !yes.is_empty() {
                        matching = matching.with_target(target.kind, NameFilter::exact(yes));
                    }
                    if !no.is_empty() {
                        rest = rest.with_target(target.kind, NameFilter::exact(no));
                    }
                }
                NameFilter::Fragments(_) => rest.targets.push(target.clone()),
            }
        }
        (matching, rest)
    }

    /// Leftovers of a NeMo Microservices install: the platform operators'
    /// CRDs, the Volcano batch scheduler and the Argo workflow engine, plus
    /// the security-policy bindings granted at bootstrap.
    pub fn nemo_platform() -> Self {
        Self::new()
            .with_target(
                ResourceKind::CustomResourceDefinition,
                NameFilter::exact([
                    "jobs.batch.volcano.sh",
                    "commands.bus.volcano.sh",
                    "podgroups.scheduling.volcano.sh",
                    "queues.scheduling.volcano.sh",
                    "numatopologies.nodeinfo.volcano.sh",
                    "jobflows.flow.volcano.sh",
                    "jobtemplates.flow.volcano.sh",
                    "workflows.argoproj.io",
                    "workflowtemplates.argoproj.io",
                    "clusterworkflowtemplates.argoproj.io",
                    "cronworkflows.argoproj.io",
                    "workflowtaskresults.argoproj.io",
                    "workflowtasksets.argoproj.io",
                    "workflowartifactgctasks.argoproj.io",
                    "workfloweventbindings.argoproj.io",
                    "nemocustomizers.apps.nvidia.com",
                    "nemodatastores.apps.nvidia.com",
                    "nemoentitystores.apps.nvidia.com",
                    "nemoevaluators.apps.nvidia.com",
                    "nemoguardrails.apps.nvidia.com",
                    "nimcaches.apps.nvidia.com",
                    "nimservices.apps.nvidia.com",
                    "nimpipelines.apps.nvidia.com",
                ]),
            )
            .with_target(
                ResourceKind::ClusterRole,
                NameFilter::exact([
                    "volcano-scheduler",
                    "volcano-controllers",
                    "volcano-admission",
                    "argo-workflows-admin",
                    "argo-workflows-edit",
                    "argo-workflows-view",
                    "argo-workflows-workflow-controller",
                    "argo-workflows-server",
                ]),
            )
            .with_target(
                ResourceKind::ClusterRoleBinding,
                NameFilter::exact([
                    "volcano-scheduler-role",
                    "volcano-controllers-role",
                    "volcano-admission-role",
                    "argo-workflows-workflow-controller",
                    "argo-workflows-server",
                ]),
            )
            .with_target(
                ResourceKind::MutatingWebhookConfiguration,
                NameFilter::exact([
                    "volcano-admission-service-jobs-mutate",
                    "volcano-admission-service-podgroups-mutate",
                    "volcano-admission-service-pods-mutate",
                    "volcano-admission-service-queues-mutate",
                ]),
            )
            .with_target(
                ResourceKind::ValidatingWebhookConfiguration,
                NameFilter::exact([
                    "volcano-admission-service-jobs-validate",
                    "volcano-admission-service-pods-validate",
                    "volcano-admission-service-queues-validate",
                ]),
            )
            .with_target(
                ResourceKind::SecurityContextConstraints,
                NameFilter::exact(["nemo-operator-scc"]),
            )
            .with_target(
                ResourceKind::RoleBinding,
                NameFilter::exact([ANYUID_ROLE_BINDING]),
            )
    }
}
