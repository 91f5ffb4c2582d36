//! `flywheel install-nemo`, `install-infra`, `install-app`.

use super::{Context, adopt};
use crate::config::{IMAGE_PULL_SECRET, NGC_API_SECRET};
use crate::error::CliResult;
use crate::output::{self, Spinner};
use crate::runner::CommandSpec;
use crate::storage::{self, RepairOutcome};
use crate::wait;
use tracing::info;

/// Chart values the platform chart reads the secrets from.
const NEMO_EXISTING_SECRET: &str = "existingSecret";
const NEMO_EXISTING_PULL_SECRET: &str = "existingImagePullSecret";

const APP_CONFIG: &str = "foundationalFlywheelServer.config";

async fn install_release(ctx: &Context, release: &str, spec: CommandSpec) -> CliResult<()> {
    output::step(&format!("Installing release {release}"));
    let spinner = if ctx.dry_run() {
        Spinner::hidden()
    } else {
        Spinner::new(&format!("helm upgrade --install {release}"))
    };
    match ctx.runner().run_checked(&spec).await {
        Ok(_) => {
            spinner.finish_with_message(&format!("{release} installed"));
            info!(%release, namespace = %ctx.config.namespace, "release installed");
            Ok(())
        }
        Err(e) => {
            spinner.abandon_with_message(&format!("{release} failed"));
            Err(e)
        }
    }
}

async fn wait_release(ctx: &Context, release: &str) -> CliResult<()> {
    let selector = Context::release_selector(release);
    let spinner = if ctx.dry_run() {
        Spinner::hidden()
    } else {
        Spinner::new(&format!("waiting for {release} pods"))
    };
    match wait::wait_for_pods(ctx.runner(), &ctx.config, Some(&selector)).await {
        Ok(pods) => {
            spinner.finish_with_message(&format!("{release}: {} pod(s) ready", pods.len()));
            Ok(())
        }
        Err(e) => {
            spinner.abandon_with_message(&format!("{release} not ready"));
            Err(e)
        }
    }
}

pub fn nemo_spec(ctx: &Context) -> CommandSpec {
    let config = &ctx.config;
    let mut spec = ctx
        .helm_install(&config.nemo_release, &config.nemo_chart)
        .arg("--set")
        .arg(format!("{NEMO_EXISTING_SECRET}={NGC_API_SECRET}"))
        .arg("--set")
        .arg(format!("{NEMO_EXISTING_PULL_SECRET}={IMAGE_PULL_SECRET}"));
    if let Some(values) = &config.nemo_values {
        spec = spec.arg("-f").arg(config.workdir.join(values).display().to_string());
    }
    spec
}

/// Adopt leftovers, then the scheduler, then the platform chart.
pub async fn nemo(ctx: &Context) -> CliResult<()> {
    ctx.preflight(&["helm"]).await?;

    output::step("Adopting leftover cluster objects");
    let outcomes = adopt::adopt_all(ctx).await;
    output::print_adoption(&outcomes);
    let failed = crate::adopt::failure_count(&outcomes);
    if failed > 0 {
        output::warning(&format!(
            "{failed} object(s) could not be adopted; helm may refuse to install"
        ));
    }

    let config = &ctx.config;
    let volcano = ctx.helm_install(&config.volcano_release, &config.volcano_chart);
    install_release(ctx, &config.volcano_release, volcano).await?;
    wait_release(ctx, &config.volcano_release).await?;

    install_release(ctx, &config.nemo_release, nemo_spec(ctx)).await?;
    wait_release(ctx, &config.nemo_release).await?;
    output::success("NeMo platform installed");
    Ok(())
}

/// Install the prerequisites, wait, then fix Elasticsearch volume ownership.
pub async fn infra(ctx: &Context) -> CliResult<()> {
    ctx.preflight(&["helm"]).await?;
    let config = &ctx.config;
    let spec = ctx.helm_install(&config.infra_release, &config.infra_chart);
    install_release(ctx, &config.infra_release, spec).await?;

    // Elasticsearch may never become ready with a mis-owned volume, so the
    // repair runs even when the wait times out.
    let waited = wait_release(ctx, &config.infra_release).await;
    match storage::repair_es_volume(ctx.runner(), config).await {
        RepairOutcome::Repaired { uid } => {
            output::success(&format!("Elasticsearch data owned by uid {uid}"))
        }
        RepairOutcome::Skipped(reason) => {
            output::warning(&format!("Volume repair skipped: {reason}"))
        }
    }
    waited?;
    output::success("Infrastructure installed");
    Ok(())
}

pub fn app_spec(ctx: &Context) -> CommandSpec {
    let config = &ctx.config;
    let mut spec = ctx.helm_install(&config.app_release, &config.app_chart);

    for (key, endpoint) in [
        ("api_base_url", "API_BASE_URL"),
        ("nmp_config.nemo_base_url", "NEMO_BASE_URL"),
        ("nmp_config.nim_base_url", "NIM_BASE_URL"),
        ("nmp_config.datastore_base_url", "DATASTORE_BASE_URL"),
    ] {
        if let Some(url) = config.endpoint(endpoint) {
            spec = spec
                .arg("--set-string")
                .arg(format!("{APP_CONFIG}.{key}={url}"));
        }
    }

    match secret_values(ctx) {
        Some(values) => spec.arg("-f").arg("-").stdin(values),
        None => spec,
    }
}

/// Chart `secrets.*` values as a JSON (hence YAML) document for `-f -`.
/// Keys stay off the argument list and helm does not split or unescape them.
fn secret_values(ctx: &Context) -> Option<String> {
    let config = &ctx.config;
    let secrets: serde_json::Map<String, serde_json::Value> = [
        ("ngcApiKey", &config.ngc_api_key),
        ("nvidiaApiKey", &config.nvidia_api_key),
        ("hfToken", &config.hf_token),
    ]
    .into_iter()
    .filter_map(|(key, value)| Some((key.to_string(), serde_json::Value::from(value.clone()?))))
    .collect();
    if secrets.is_empty() {
        return None;
    }
    Some(serde_json::json!({ "secrets": secrets }).to_string())
}

pub async fn app(ctx: &Context) -> CliResult<()> {
    ctx.preflight(&["helm"]).await?;
    ctx.config.require_ngc_api_key("install-app")?;
    let release = ctx.config.app_release.clone();
    install_release(ctx, &release, app_spec(ctx)).await?;
    wait_release(ctx, &release).await?;
    output::success("Data Flywheel installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::runner::testing::ScriptedRunner;
    use std::sync::Arc;

    fn ctx(config: DeployConfig) -> Context {
        Context::new(config, Arc::new(ScriptedRunner::new()))
    }

    #[test]
    fn app_overrides_follow_namespace_and_hide_secrets() {
        let ctx = ctx(DeployConfig {
            namespace: "team-a".into(),
            ngc_api_key: Some("nvapi-1".into()),
            hf_token: Some("hf_2".into()),
            ..Default::default()
        });
        let spec = app_spec(&ctx);
        assert!(spec.args.contains(
            &"foundationalFlywheelServer.config.nmp_config.nemo_base_url=http://nemo-gateway.team-a.svc.cluster.local"
                .to_string()
        ));
        assert!(spec.args.contains(
            &"foundationalFlywheelServer.config.nmp_config.datastore_base_url=http://nemodatastore-sample.team-a.svc.cluster.local:8000"
                .to_string()
        ));
        assert!(!spec.args.iter().any(|a| a.contains("nvapi-1") || a.contains("hf_2")));

        let values: serde_json::Value =
            serde_json::from_str(spec.stdin.as_deref().unwrap()).unwrap();
        assert_eq!(values["secrets"]["ngcApiKey"], "nvapi-1");
        assert_eq!(values["secrets"]["hfToken"], "hf_2");
        assert!(values["secrets"].get("nvidiaApiKey").is_none());

        let shown = spec.display();
        assert!(shown.ends_with("-f - < (stdin)"));
        assert!(!shown.contains("nvapi-1"));
        assert!(shown.contains("-n team-a"));
    }

    #[test]
    fn secrets_with_helm_syntax_are_passed_untouched() {
        let ctx = ctx(DeployConfig {
            ngc_api_key: Some(r"nv,api\key=1".into()),
            ..Default::default()
        });
        let spec = app_spec(&ctx);
        let values: serde_json::Value =
            serde_json::from_str(spec.stdin.as_deref().unwrap()).unwrap();
        assert_eq!(values["secrets"]["ngcApiKey"], r"nv,api\key=1");
    }

    #[test]
    fn no_secrets_means_no_values_document() {
        let spec = app_spec(&ctx(DeployConfig::default()));
        assert!(spec.stdin.is_none());
        assert!(!spec.args.contains(&"-".to_string()));
    }

    #[test]
    fn nemo_chart_uses_bootstrap_secrets() {
        let spec = nemo_spec(&ctx(DeployConfig::default()));
        assert!(spec.args.contains(&"existingSecret=ngc-api".to_string()));
        assert!(spec.args.contains(&"existingImagePullSecret=nvcrimagepullsecret".to_string()));
        assert!(!spec.args.contains(&"-f".to_string()));
    }
}
