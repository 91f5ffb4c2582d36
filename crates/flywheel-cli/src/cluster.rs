//! `oc`/`kubectl` backed implementation of the kernel's [`ClusterApi`].

use crate::error::CliError;
use crate::runner::{CommandRunner, CommandSpec};
use async_trait::async_trait;
use flywheel_kernel::adoption::{AdoptionError, ClusterApi, ClusterObject, ResourceKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Merge patch that empties `metadata.managedFields`. The API server rejects
/// an empty list, so a single empty entry is the documented way to reset it.
const CLEAR_MANAGED_FIELDS: &str = r#"{"metadata":{"managedFields":[{}]}}"#;

#[derive(Debug, Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    annotations: Option<BTreeMap<String, String>>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    managed_fields: Vec<ManagedField>,
}

#[derive(Debug, Deserialize)]
struct ManagedField {
    #[serde(default)]
    manager: Option<String>,
}

/// Parse the output of `get <resource> -o json` into object snapshots.
pub fn parse_object_list(
    kind: ResourceKind,
    json: &str,
    command: &str,
) -> Result<Vec<ClusterObject>, AdoptionError> {
    let list: ObjectList = serde_json::from_str(json).map_err(|e| AdoptionError::Decode {
        command: command.to_string(),
        message: e.to_string(),
    })?;
    Ok(list
        .items
        .into_iter()
        .map(|item| {
            let meta = item.metadata;
            let mut managers: Vec<String> = meta
                .managed_fields
                .into_iter()
                .filter_map(|f| f.manager)
                .collect();
            managers.dedup();
            ClusterObject {
                kind,
                name: meta.name,
                namespace: meta.namespace,
                annotations: meta.annotations.unwrap_or_default(),
                labels: meta.labels.unwrap_or_default(),
                field_managers: managers,
            }
        })
        .collect())
}

fn to_adoption_error(err: CliError) -> AdoptionError {
    match err {
        CliError::CommandFailed { command, stderr, .. } => {
            AdoptionError::CommandFailed { command, stderr }
        }
        CliError::Spawn { command, source } => AdoptionError::Spawn { command, source },
        other => AdoptionError::Decode {
            command: String::new(),
            message: other.to_string(),
        },
    }
}

fn pairs(map: &BTreeMap<String, String>) -> impl Iterator<Item = String> + '_ {
    map.iter().map(|(k, v)| format!("{k}={v}"))
}

/// Talks to the cluster by shelling out to the configured CLI tool.
#[derive(Clone)]
pub struct OcCluster {
    runner: Arc<dyn CommandRunner>,
    tool: String,
}

impl OcCluster {
    pub fn new(runner: Arc<dyn CommandRunner>, tool: impl Into<String>) -> Self {
        Self {
            runner,
            tool: tool.into(),
        }
    }

    fn command(&self, verb: &str, object: &ClusterObject) -> CommandSpec {
        let spec = CommandSpec::new(&self.tool)
            .arg(verb)
            .arg(object.kind.resource_name())
            .arg(&object.name);
        match &object.namespace {
            Some(ns) if object.kind.is_namespaced() => spec.args(["-n", ns.as_str()]),
            _ => spec,
        }
    }

    async fn checked(&self, spec: CommandSpec) -> Result<String, AdoptionError> {
        self.runner.run_checked(&spec).await.map_err(to_adoption_error)
    }
}

#[async_trait]
impl ClusterApi for OcCluster {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<ClusterObject>, AdoptionError> {
        let mut spec = CommandSpec::new(&self.tool)
            .args(["get", kind.resource_name(), "-o", "json"])
            .read_only();
        if kind.is_namespaced() {
            spec = spec.args(["-n", namespace]);
        }
        let command = spec.display();
        let stdout = self.checked(spec).await?;
        // Dry-run runners answer with empty output.
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_object_list(kind, &stdout, &command)
    }

    async fn clear_field_managers(&self, object: &ClusterObject) -> Result<(), AdoptionError> {
        let spec = self
            .command("patch", object)
            .args(["--type=merge", "-p", CLEAR_MANAGED_FIELDS]);
        self.checked(spec).await.map(|_| ())
    }

    async fn set_metadata(
        &self,
        object: &ClusterObject,
        annotations: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), AdoptionError> {
        if !annotations.is_empty() {
            let spec = self
                .command("annotate", object)
                .args(pairs(annotations))
                .arg("--overwrite");
            self.checked(spec).await?;
        }
        if !labels.is_empty() {
            let spec = self
                .command("label", object)
                .args(pairs(labels))
                .arg("--overwrite");
            self.checked(spec).await?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::runner::testing::ScriptedRunner;
    use flywheel_kernel::adoption::ReleaseIdentity;

    const CLUSTER_ROLES: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "metadata": {
                    "name": "volcano-scheduler",
                    "annotations": {"meta.helm.sh/release-name": "volcano"},
                    "managedFields": [
                        {"manager": "helm", "operation": "Update"},
                        {"manager": "kubectl-client-side-apply", "operation": "Update"}
                    ]
                }
            },
            {"metadata": {"name": "admin"}}
        ]
    }"#;

    #[test]
    fn parses_list_output() {
        let objects =
            parse_object_list(ResourceKind::ClusterRole, CLUSTER_ROLES, "oc get").unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "volcano-scheduler");
        assert_eq!(
            objects[0].field_managers,
            vec!["helm", "kubectl-client-side-apply"]
        );
        assert_eq!(objects[0].annotations["meta.helm.sh/release-name"], "volcano");
        assert!(objects[1].labels.is_empty());
    }

    #[test]
    fn garbage_output_is_decode_error() {
        let err = parse_object_list(ResourceKind::ClusterRole, "nope", "oc get").unwrap_err();
        assert!(matches!(err, AdoptionError::Decode { .. }));
    }

    #[tokio::test]
    async fn namespaced_kinds_are_listed_in_namespace() {
        let runner = Arc::new(ScriptedRunner::new().on("oc get", CommandOutput::ok(r#"{"items":[]}"#)));
        let cluster = OcCluster::new(runner.clone(), "oc");
        cluster.list(ResourceKind::RoleBinding, "flywheel").await.unwrap();
        cluster.list(ResourceKind::ClusterRole, "flywheel").await.unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "oc get rolebindings -o json -n flywheel",
                "oc get clusterroles -o json",
            ]
        );
    }

    #[tokio::test]
    async fn writes_patch_then_overwrite_metadata() {
        let runner = Arc::new(ScriptedRunner::new());
        let cluster = OcCluster::new(runner.clone(), "kubectl");
        let object = ClusterObject::new(ResourceKind::ClusterRole, "volcano-scheduler");
        let identity = ReleaseIdentity::new("nemo", "flywheel");

        cluster.clear_field_managers(&object).await.unwrap();
        cluster
            .set_metadata(&object, &identity.annotations(), &identity.labels())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].starts_with("kubectl patch clusterroles volcano-scheduler --type=merge"));
        assert_eq!(
            calls[1],
            "kubectl annotate clusterroles volcano-scheduler \
             meta.helm.sh/release-name=nemo meta.helm.sh/release-namespace=flywheel --overwrite"
        );
        assert_eq!(
            calls[2],
            "kubectl label clusterroles volcano-scheduler \
             app.kubernetes.io/managed-by=Helm --overwrite"
        );
    }

    #[tokio::test]
    async fn command_failure_maps_to_adoption_error() {
        let runner = Arc::new(ScriptedRunner::new().on("oc get", CommandOutput::failed(1, "forbidden")));
        let cluster = OcCluster::new(runner, "oc");
        let err = cluster
            .list(ResourceKind::SecurityContextConstraints, "x")
            .await
            .unwrap_err();
        match err {
            AdoptionError::CommandFailed { stderr, .. } => assert_eq!(stderr, "forbidden"),
            other => panic!("unexpected: {other}"),
        }
    }
}
