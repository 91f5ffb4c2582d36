//! Bounded readiness polling.

use crate::config::DeployConfig;
use crate::error::{CliError, CliResult};
use crate::runner::{CommandRunner, CommandSpec};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Call `probe` every `interval` until it yields `Some`, or fail with
/// [`CliError::Timeout`] once `timeout` has elapsed.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> CliResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CliResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(CliError::Timeout {
                what: what.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: PodMeta,
    #[serde(default)]
    status: PodStatusRaw,
}

#[derive(Debug, Deserialize)]
struct PodMeta {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatusRaw {
    #[serde(default)]
    phase: String,
    #[serde(default)]
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    #[serde(default)]
    ready: bool,
}

/// Readiness of one pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodReadiness {
    pub name: String,
    pub phase: String,
    pub ready: usize,
    pub total: usize,
}

impl PodReadiness {
    /// Completed job pods count as done.
    pub fn is_settled(&self) -> bool {
        self.phase == "Succeeded" || (self.phase == "Running" && self.ready == self.total)
    }
}

pub fn parse_pods(json: &str) -> CliResult<Vec<PodReadiness>> {
    let list: PodList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|pod| PodReadiness {
            name: pod.metadata.name,
            phase: pod.status.phase,
            ready: pod
                .status
                .container_statuses
                .iter()
                .filter(|c| c.ready)
                .count(),
            total: pod.status.container_statuses.len(),
        })
        .collect())
}

pub async fn pods(
    runner: &dyn CommandRunner,
    config: &DeployConfig,
    selector: Option<&str>,
) -> CliResult<Vec<PodReadiness>> {
    let mut spec = CommandSpec::new(&config.tool)
        .args(["get", "pods", "-n", config.namespace.as_str(), "-o", "json"])
        .read_only();
    if let Some(selector) = selector {
        spec = spec.args(["-l", selector]);
    }
    let stdout = runner.run_checked(&spec).await?;
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    parse_pods(&stdout)
}

/// Wait until every pod matching `selector` has settled. An empty pod list
/// keeps waiting, since charts create pods asynchronously.
pub async fn wait_for_pods(
    runner: &dyn CommandRunner,
    config: &DeployConfig,
    selector: Option<&str>,
) -> CliResult<Vec<PodReadiness>> {
    if runner.is_dry_run() {
        return Ok(Vec::new());
    }
    let what = match selector {
        Some(s) => format!("pods ({s}) in {}", config.namespace),
        None => format!("pods in {}", config.namespace),
    };
    poll_until(&what, config.wait_timeout(), config.poll_interval(), move || async move {
        let current = pods(runner, config, selector).await?;
        let pending = current.iter().filter(|p| !p.is_settled()).count();
        debug!(total = current.len(), pending, "pod readiness");
        Ok::<_, CliError>((!current.is_empty() && pending == 0).then_some(current))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PODS: &str = r#"{"items": [
        {"metadata": {"name": "es-0"}, "status": {"phase": "Running",
            "containerStatuses": [{"ready": true}, {"ready": false}]}},
        {"metadata": {"name": "migrate-x"}, "status": {"phase": "Succeeded",
            "containerStatuses": [{"ready": false}]}},
        {"metadata": {"name": "pending-y"}}
    ]}"#;

    #[test]
    fn parses_pod_readiness() {
        let pods = parse_pods(PODS).unwrap();
        assert_eq!(pods.len(), 3);
        assert_eq!((pods[0].ready, pods[0].total), (1, 2));
        assert!(!pods[0].is_settled());
        assert!(pods[1].is_settled());
        assert_eq!(pods[2].phase, "");
        assert!(!pods[2].is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_returns_once_probe_succeeds() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let value = poll_until("thing", Duration::from_secs(60), Duration::from_secs(5), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CliError>((n == 2).then_some(n))
        })
        .await
        .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_times_out() {
        let err = poll_until("thing", Duration::from_secs(30), Duration::from_secs(10), || async {
            Ok::<Option<()>, CliError>(None)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CliError::Timeout { seconds: 30, .. }));
    }
}
