//! Elasticsearch data-volume ownership repair.
//!
//! OpenShift runs pods with a namespace-specific UID, so a data volume
//! provisioned for another UID is unwritable. Repair is best effort: any
//! failure is logged and the install carries on.

use crate::config::DeployConfig;
use crate::error::CliResult;
use crate::runner::{CommandRunner, CommandSpec};
use tracing::{info, warn};

pub const UID_RANGE_ANNOTATION: &str = "openshift.io/sa.scc.uid-range";
const ES_DATA_DIR: &str = "/usr/share/elasticsearch/data";

/// First UID of an `<uid>/<size>` range.
pub fn parse_uid_range(value: &str) -> Option<u32> {
    let (uid, size) = value.trim().split_once('/')?;
    size.parse::<u32>().ok().filter(|s| *s > 0)?;
    uid.parse().ok()
}

async fn namespace_uid(runner: &dyn CommandRunner, config: &DeployConfig) -> CliResult<Option<u32>> {
    let jsonpath = format!(
        "jsonpath={{.metadata.annotations.{}}}",
        UID_RANGE_ANNOTATION.replace('.', "\\.")
    );
    let spec = CommandSpec::new(&config.tool)
        .args(["get", "namespace", config.namespace.as_str(), "-o", jsonpath.as_str()])
        .read_only();
    let value = runner.run_checked(&spec).await?;
    Ok(parse_uid_range(&value))
}

/// What the repair ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    Repaired { uid: u32 },
    Skipped(String),
}

/// `chown -R <uid>:0` the data directory inside the Elasticsearch pod.
pub async fn repair_es_volume(runner: &dyn CommandRunner, config: &DeployConfig) -> RepairOutcome {
    let uid = match namespace_uid(runner, config).await {
        Ok(Some(uid)) => uid,
        Ok(None) => {
            let reason = format!("namespace has no usable {UID_RANGE_ANNOTATION} annotation");
            warn!(namespace = %config.namespace, "{reason}, skipping volume repair");
            return RepairOutcome::Skipped(reason);
        }
        Err(e) => {
            warn!(namespace = %config.namespace, error = %e, "cannot read namespace, skipping volume repair");
            return RepairOutcome::Skipped(e.to_string());
        }
    };

    let spec = CommandSpec::new(&config.tool).args([
        "exec".to_string(),
        config.es_data_pod.clone(),
        "-n".to_string(),
        config.namespace.clone(),
        "--".to_string(),
        "chown".to_string(),
        "-R".to_string(),
        format!("{uid}:0"),
        ES_DATA_DIR.to_string(),
    ]);
    match runner.run_checked(&spec).await {
        Ok(_) => {
            info!(pod = %config.es_data_pod, uid, "repaired data volume ownership");
            RepairOutcome::Repaired { uid }
        }
        Err(e) => {
            warn!(pod = %config.es_data_pod, error = %e, "volume repair failed, continuing");
            RepairOutcome::Skipped(e.to_string())
        }
    }
}
