//! One module per `flywheel` subcommand.

pub mod adopt;
pub mod bootstrap;
pub mod cleanup;
pub mod clone;
pub mod env;
pub mod install;
pub mod status;
pub mod verify;

use crate::cluster::OcCluster;
use crate::config::DeployConfig;
use crate::error::CliResult;
use crate::preflight;
use crate::runner::{CommandRunner, CommandSpec};
use flywheel_kernel::adoption::{AdoptionPlan, ReleaseIdentity};
use std::sync::Arc;

/// Shared state handed to every step.
pub struct Context {
    pub config: DeployConfig,
    pub runner: Arc<dyn CommandRunner>,
}

impl Context {
    pub fn new(config: DeployConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn cluster(&self) -> OcCluster {
        OcCluster::new(self.runner.clone(), &self.config.tool)
    }

    /// `<tool> ...`
    pub fn kube(&self) -> CommandSpec {
        CommandSpec::new(&self.config.tool)
    }

    /// `helm ... -n <namespace>`
    pub fn helm<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> CommandSpec {
        CommandSpec::new("helm")
            .args(args)
            .args(["-n", self.config.namespace.as_str()])
    }

    /// Preflight for steps that run after `bootstrap`.
    pub async fn preflight(&self, extra: &[&str]) -> CliResult<()> {
        let mut binaries = vec![self.config.tool.as_str()];
        binaries.extend_from_slice(extra);
        preflight::check(self.runner(), &self.config, &binaries, true).await
    }

    pub fn dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// `helm upgrade --install <release> <chart> -n <ns>` plus `extra`.
    pub fn helm_install(&self, release: &str, chart: &str) -> CommandSpec {
        let chart = self.config.chart_ref(chart);
        self.helm(["upgrade", "--install", release, chart.as_str()])
    }

    /// Label selector for pods of a release.
    pub fn release_selector(release: &str) -> String {
        format!("app.kubernetes.io/instance={release}")
    }

    /// The NeMo adoption plan split by owning release: Volcano objects go
    /// to the scheduler release, everything else to the platform release.
    pub fn adoption_releases(&self) -> Vec<(ReleaseIdentity, AdoptionPlan)> {
        let ns = &self.config.namespace;
        let (volcano, nemo) = AdoptionPlan::nemo_platform().partition(|n| n.contains("volcano"));
        vec![
            (ReleaseIdentity::new(&self.config.volcano_release, ns), volcano),
            (ReleaseIdentity::new(&self.config.nemo_release, ns), nemo),
        ]
    }
}
