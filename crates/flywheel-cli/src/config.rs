//! Deploy configuration.
//!
//! Every step receives one [`DeployConfig`], built once at startup from the
//! `.env` file, then the process environment, then command-line overrides.

use crate::error::{CliError, CliResult};
use flywheel_kernel::config::load_config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATA_FLYWHEEL_REPO: &str = "https://github.com/NVIDIA-AI-Blueprints/data-flywheel.git";
pub const NEMO_HELM_REPO: &str = "https://helm.ngc.nvidia.com/nvidia/nemo-microservices";
pub const VOLCANO_HELM_REPO: &str = "https://volcano-sh.github.io/helm-charts";

/// Image pull secret for `nvcr.io`.
pub const IMAGE_PULL_SECRET: &str = "nvcrimagepullsecret";
/// Generic secret carrying `NGC_API_KEY`.
pub const NGC_API_SECRET: &str = "ngc-api";

fn default_namespace() -> String {
    "flywheel".to_string()
}
fn default_tool() -> String {
    "oc".to_string()
}
fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}
fn default_volcano_release() -> String {
    "volcano".to_string()
}
fn default_volcano_chart() -> String {
    "volcano-sh/volcano".to_string()
}
fn default_nemo_release() -> String {
    "nemo".to_string()
}
fn default_nemo_chart() -> String {
    "nemo-microservices/nemo-microservices-helm-chart".to_string()
}
fn default_infra_release() -> String {
    "flywheel-infra".to_string()
}
fn default_infra_chart() -> String {
    "data-flywheel/deploy/helm/flywheel-infra".to_string()
}
fn default_app_release() -> String {
    "data-flywheel".to_string()
}
fn default_app_chart() -> String {
    "data-flywheel/deploy/helm/data-flywheel".to_string()
}
fn default_es_data_pod() -> String {
    "elasticsearch-master-0".to_string()
}
fn default_wait_timeout_secs() -> u64 {
    900
}
fn default_poll_interval_secs() -> u64 {
    10
}

/// Everything a deploy step needs to know.
///
/// Keys in the `.env` file are the upper-case names (`NAMESPACE`,
/// `NGC_API_KEY`, ...); the lower-case field names are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(alias = "NAMESPACE", default = "default_namespace")]
    pub namespace: String,
    #[serde(alias = "NGC_API_KEY", default)]
    pub ngc_api_key: Option<String>,
    #[serde(alias = "NVIDIA_API_KEY", default)]
    pub nvidia_api_key: Option<String>,
    #[serde(alias = "HF_TOKEN", default)]
    pub hf_token: Option<String>,

    /// Cluster CLI, `oc` or `kubectl`.
    #[serde(alias = "CLUSTER_TOOL", alias = "cluster_tool", default = "default_tool")]
    pub tool: String,
    /// Where repositories are cloned and relative charts are resolved.
    #[serde(alias = "WORKDIR", default = "default_workdir")]
    pub workdir: PathBuf,

    #[serde(alias = "VOLCANO_RELEASE", default = "default_volcano_release")]
    pub volcano_release: String,
    #[serde(alias = "VOLCANO_CHART", default = "default_volcano_chart")]
    pub volcano_chart: String,
    #[serde(alias = "NEMO_RELEASE", default = "default_nemo_release")]
    pub nemo_release: String,
    #[serde(alias = "NEMO_CHART", default = "default_nemo_chart")]
    pub nemo_chart: String,
    #[serde(alias = "NEMO_VALUES", default)]
    pub nemo_values: Option<PathBuf>,
    #[serde(alias = "INFRA_RELEASE", default = "default_infra_release")]
    pub infra_release: String,
    #[serde(alias = "INFRA_CHART", default = "default_infra_chart")]
    pub infra_chart: String,
    #[serde(alias = "APP_RELEASE", default = "default_app_release")]
    pub app_release: String,
    #[serde(alias = "APP_CHART", default = "default_app_chart")]
    pub app_chart: String,

    /// Pod whose data volume gets its ownership repaired after install.
    #[serde(alias = "ES_DATA_POD", default = "default_es_data_pod")]
    pub es_data_pod: String,

    /// Gateway base URL used by `verify`. Defaults to the in-cluster service.
    #[serde(alias = "GATEWAY_URL", default)]
    pub gateway_url: Option<String>,

    #[serde(alias = "WAIT_TIMEOUT_SECS", default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(alias = "POLL_INTERVAL_SECS", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            ngc_api_key: None,
            nvidia_api_key: None,
            hf_token: None,
            tool: default_tool(),
            workdir: default_workdir(),
            volcano_release: default_volcano_release(),
            volcano_chart: default_volcano_chart(),
            nemo_release: default_nemo_release(),
            nemo_chart: default_nemo_chart(),
            nemo_values: None,
            infra_release: default_infra_release(),
            infra_chart: default_infra_chart(),
            app_release: default_app_release(),
            app_chart: default_app_chart(),
            es_data_pod: default_es_data_pod(),
            gateway_url: None,
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Strip one pair of matching surrounding quotes, as shells do for `.env`.
fn unquote(value: &str) -> String {
    let v = value.trim();
    for q in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return v[1..v.len() - 1].to_string();
        }
    }
    v.to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| unquote(&v)).filter(|v| !v.is_empty())
}

impl DeployConfig {
    /// Load from `env_file` (if present), overlay the process environment,
    /// then apply `namespace_override`.
    pub fn load(env_file: &Path, namespace_override: Option<&str>) -> CliResult<Self> {
        Self::load_with(env_file, namespace_override, |k| std::env::var(k).ok())
    }

    pub fn load_with(
        env_file: &Path,
        namespace_override: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CliResult<Self> {
        let mut config = if env_file.exists() {
            let path = env_file
                .to_str()
                .ok_or_else(|| CliError::ConfigError(format!("non-UTF-8 path {env_file:?}")))?;
            tracing::debug!(path, "loading deploy config");
            load_config::<DeployConfig>(path)?
        } else {
            tracing::debug!(path = %env_file.display(), "env file not found, using defaults");
            DeployConfig::default()
        };

        config.overlay(lookup);
        if let Some(ns) = namespace_override {
            config.namespace = ns.to_string();
        }
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Process environment wins over the file for the core keys.
    fn overlay(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ns) = non_empty(lookup("NAMESPACE")) {
            self.namespace = ns;
        }
        for (key, slot) in [
            ("NGC_API_KEY", &mut self.ngc_api_key),
            ("NVIDIA_API_KEY", &mut self.nvidia_api_key),
            ("HF_TOKEN", &mut self.hf_token),
            ("GATEWAY_URL", &mut self.gateway_url),
        ] {
            if let Some(v) = non_empty(lookup(key)) {
                *slot = Some(v);
            }
        }
    }

    fn normalize(&mut self) {
        self.namespace = unquote(&self.namespace);
        self.ngc_api_key = non_empty(self.ngc_api_key.take());
        self.nvidia_api_key = non_empty(self.nvidia_api_key.take());
        self.hf_token = non_empty(self.hf_token.take());
        self.gateway_url = non_empty(self.gateway_url.take());
    }

    pub fn validate(&self) -> CliResult<()> {
        let ns = &self.namespace;
        let valid = !ns.is_empty()
            && ns.len() <= 63
            && ns
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !ns.starts_with('-')
            && !ns.ends_with('-');
        if !valid {
            return Err(CliError::ConfigError(format!(
                "namespace '{ns}' is not a valid DNS label"
            )));
        }
        if self.tool != "oc" && self.tool != "kubectl" {
            return Err(CliError::ConfigError(format!(
                "cluster tool must be `oc` or `kubectl`, got `{}`",
                self.tool
            )));
        }
        if self.poll_interval_secs == 0 || self.wait_timeout_secs == 0 {
            return Err(CliError::ConfigError(
                "wait timeout and poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// `NGC_API_KEY`, or a configuration error naming the step that needs it.
    pub fn require_ngc_api_key(&self, step: &str) -> CliResult<&str> {
        self.ngc_api_key.as_deref().ok_or_else(|| {
            CliError::ConfigError(format!("NGC_API_KEY is required for `{step}`"))
        })
    }

    /// Resolve a chart reference: local paths are taken relative to the workdir,
    /// `repo/chart` references are passed through.
    pub fn chart_ref(&self, chart: &str) -> String {
        let local = self.workdir.join(chart);
        if local.exists() {
            local.display().to_string()
        } else {
            chart.to_string()
        }
    }

    pub fn gateway_base_url(&self) -> String {
        self.gateway_url
            .clone()
            .unwrap_or_else(|| format!("http://nemo-gateway.{}.svc.cluster.local", self.namespace))
            .trim_end_matches('/')
            .to_string()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// In-cluster service endpoints the application and notebooks read.
    pub fn service_endpoints(&self) -> Vec<(&'static str, String)> {
        let ns = &self.namespace;
        let gateway = format!("http://nemo-gateway.{ns}.svc.cluster.local");
        vec![
            ("API_BASE_URL", format!("http://df-api-service.{ns}.svc.cluster.local:8000")),
            (
                "ELASTICSEARCH_URL",
                format!("http://elasticsearch-master.{ns}.svc.cluster.local:9200"),
            ),
            (
                "MONGODB_URL",
                format!("mongodb://{}-mongodb.{ns}.svc.cluster.local:27017", self.infra_release),
            ),
            (
                "REDIS_URL",
                format!("redis://{}-redis-master.{ns}.svc.cluster.local:6379/0", self.infra_release),
            ),
            (
                "MLFLOW_TRACKING_URI",
                format!("http://df-mlflow-service.{ns}.svc.cluster.local:5000"),
            ),
            ("NEMO_BASE_URL", gateway.clone()),
            ("NIM_BASE_URL", gateway),
            (
                "DATASTORE_BASE_URL",
                format!("http://nemodatastore-sample.{ns}.svc.cluster.local:8000"),
            ),
        ]
    }

    pub fn endpoint(&self, key: &str) -> Option<String> {
        self.service_endpoints()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_env(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(".env");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = DeployConfig::load_with(&dir.path().join(".env"), None, no_env).unwrap();
        assert_eq!(cfg, DeployConfig::default());
    }

    #[test]
    fn env_file_populates_config() {
        let dir = TempDir::new().unwrap();
        let path = write_env(
            &dir,
            "NAMESPACE=dfwbp\nNGC_API_KEY=\"nvapi-abc\"\nHF_TOKEN=hf_x\nWAIT_TIMEOUT_SECS=60\n",
        );
        let cfg = DeployConfig::load_with(&path, None, no_env).unwrap();
        assert_eq!(cfg.namespace, "dfwbp");
        assert_eq!(cfg.ngc_api_key.as_deref(), Some("nvapi-abc"));
        assert_eq!(cfg.hf_token.as_deref(), Some("hf_x"));
        assert_eq!(cfg.nvidia_api_key, None);
        assert_eq!(cfg.wait_timeout_secs, 60);
        assert_eq!(cfg.tool, "oc");
    }

    #[test]
    fn process_env_and_flag_override_file() {
        let dir = TempDir::new().unwrap();
        let path = write_env(&dir, "NAMESPACE=from-file\nNGC_API_KEY=file-key\n");
        let env: HashMap<&str, &str> = [("NGC_API_KEY", "env-key"), ("NAMESPACE", "from-env")].into();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let cfg = DeployConfig::load_with(&path, None, lookup).unwrap();
        assert_eq!(cfg.namespace, "from-env");
        assert_eq!(cfg.ngc_api_key.as_deref(), Some("env-key"));

        let cfg = DeployConfig::load_with(&path, Some("from-flag"), lookup).unwrap();
        assert_eq!(cfg.namespace, "from-flag");
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = DeployConfig::load_with(&dir.path().join(".env"), Some("Bad_NS"), no_env)
            .unwrap_err();
        assert!(matches!(err, CliError::ConfigError(_)));
    }

    #[test]
    fn missing_ngc_key_names_the_step() {
        let err = DeployConfig::default()
            .require_ngc_api_key("bootstrap")
            .unwrap_err();
        assert!(err.to_string().contains("bootstrap"));
    }

    #[test]
    fn endpoints_follow_namespace() {
        let cfg = DeployConfig {
            namespace: "team-a".to_string(),
            ..Default::default()
        };
        assert_eq!(
            cfg.endpoint("API_BASE_URL").unwrap(),
            "http://df-api-service.team-a.svc.cluster.local:8000"
        );
        assert_eq!(
            cfg.endpoint("REDIS_URL").unwrap(),
            "redis://flywheel-infra-redis-master.team-a.svc.cluster.local:6379/0"
        );
        assert_eq!(cfg.endpoint("NEMO_BASE_URL"), cfg.endpoint("NIM_BASE_URL"));
        assert_eq!(cfg.service_endpoints().len(), 8);
        assert_eq!(
            cfg.gateway_base_url(),
            "http://nemo-gateway.team-a.svc.cluster.local"
        );
    }

    #[test]
    fn unquote_strips_matching_quotes_only() {
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("'a'"), "a");
        assert_eq!(unquote("\"a'"), "\"a'");
        assert_eq!(unquote(" plain "), "plain");
    }
}
