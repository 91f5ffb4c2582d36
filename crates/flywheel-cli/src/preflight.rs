//! Preconditions checked before a step touches the cluster.
//!
//! Failures here are fatal and never retried.

use crate::config::DeployConfig;
use crate::error::{CliError, CliResult};
use crate::runner::{CommandRunner, CommandSpec};
use std::ffi::OsStr;
use tracing::debug;

pub fn command_exists(binary: &str) -> bool {
    command_exists_in_path(binary, std::env::var_os("PATH").as_deref())
}

pub fn command_exists_in_path(binary: &str, path_var: Option<&OsStr>) -> bool {
    let Some(path_var) = path_var else {
        return false;
    };

    std::env::split_paths(path_var).any(|dir| {
        let direct = dir.join(binary);
        if direct.is_file() {
            return true;
        }

        #[cfg(windows)]
        {
            for ext in [".exe", ".cmd", ".bat"] {
                let with_ext = dir.join(format!("{binary}{ext}"));
                if with_ext.is_file() {
                    return true;
                }
            }
        }

        false
    })
}

/// Fail unless every binary is on `PATH`.
pub fn require_binaries(binaries: &[&str]) -> CliResult<()> {
    let missing: Vec<&str> = binaries
        .iter()
        .copied()
        .filter(|b| !command_exists(b))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::Preflight(format!(
            "required binaries not found on PATH: {}",
            missing.join(", ")
        )))
    }
}

/// Fail unless the cluster CLI has a logged-in session.
pub async fn require_login(runner: &dyn CommandRunner, config: &DeployConfig) -> CliResult<String> {
    // kubectl has no whoami; `auth whoami` needs a recent server.
    let args: &[&str] = if config.tool == "oc" {
        &["whoami"]
    } else {
        &["auth", "whoami", "-o", "name"]
    };
    let spec = CommandSpec::new(&config.tool).args(args.iter().copied()).read_only();

    let output = runner.run(&spec).await?;
    if !output.success() {
        return Err(CliError::Preflight(format!(
            "not logged in to the cluster (`{}`): {}",
            spec.display(),
            output.stderr.trim()
        )));
    }
    let user = output.stdout.trim().to_string();
    debug!(%user, "cluster session ok");
    Ok(user)
}

pub async fn namespace_exists(runner: &dyn CommandRunner, config: &DeployConfig) -> CliResult<bool> {
    let spec = CommandSpec::new(&config.tool)
        .args(["get", "namespace", config.namespace.as_str(), "-o", "name"])
        .read_only();
    Ok(runner.run(&spec).await?.success())
}

/// Fail unless the target namespace exists. Steps after `bootstrap` use this.
pub async fn require_namespace(runner: &dyn CommandRunner, config: &DeployConfig) -> CliResult<()> {
    if namespace_exists(runner, config).await? {
        Ok(())
    } else {
        Err(CliError::Preflight(format!(
            "namespace '{}' does not exist; run `flywheel bootstrap` first",
            config.namespace
        )))
    }
}

/// Binaries, login, and optionally the namespace.
pub async fn check(
    runner: &dyn CommandRunner,
    config: &DeployConfig,
    binaries: &[&str],
    need_namespace: bool,
) -> CliResult<()> {
    require_binaries(binaries)?;
    require_login(runner, config).await?;
    if need_namespace {
        require_namespace(runner, config).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::runner::testing::ScriptedRunner;
    use tempfile::tempdir;

    #[test]
    fn command_lookup_uses_path_entries() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("helm"), "").unwrap();
        let path = std::env::join_paths([dir.path()]).unwrap();
        assert!(command_exists_in_path("helm", Some(path.as_os_str())));
        assert!(!command_exists_in_path("oc", Some(path.as_os_str())));
        assert!(!command_exists_in_path("helm", None));
    }

    #[test]
    fn missing_binary_is_preflight_error() {
        let err = require_binaries(&["flywheel-no-such-tool"]).unwrap_err();
        assert!(matches!(err, CliError::Preflight(msg) if msg.contains("flywheel-no-such-tool")));
    }

    #[tokio::test]
    async fn logged_out_session_is_fatal() {
        let runner = ScriptedRunner::new().on(
            "oc whoami",
            CommandOutput::failed(1, "error: You must be logged in to the server (Unauthorized)"),
        );
        let err = require_login(&runner, &DeployConfig::default()).await.unwrap_err();
        assert!(matches!(err, CliError::Preflight(msg) if msg.contains("Unauthorized")));
    }

    #[tokio::test]
    async fn missing_namespace_points_at_bootstrap() {
        let runner = ScriptedRunner::new()
            .on("oc whoami", CommandOutput::ok("kube:admin\n"))
            .on("oc get namespace", CommandOutput::failed(1, "NotFound"));
        let err = require_namespace(&runner, &DeployConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("flywheel bootstrap"));

        let user = require_login(&runner, &DeployConfig::default()).await.unwrap();
        assert_eq!(user, "kube:admin");
    }
}
