//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flywheel - deploy and verify the Data Flywheel stack on OpenShift
#[derive(Parser)]
#[command(name = "flywheel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Deploy settings file (KEY=VALUE lines)
    #[arg(long, global = true, default_value = ".env", env = "FLYWHEEL_ENV_FILE")]
    pub env_file: PathBuf,

    /// Target namespace (overrides NAMESPACE from the env file)
    #[arg(short = 'n', long, global = true)]
    pub namespace: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print mutating commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the namespace, image pull and API secrets, and grant the anyuid SCC
    Bootstrap,

    /// Clone the Data Flywheel repository and register chart repositories
    Clone,

    /// Adopt leftovers, then install the Volcano scheduler and NeMo platform
    InstallNemo,

    /// Install Elasticsearch, Redis and MongoDB and repair volume ownership
    InstallInfra,

    /// Install the Data Flywheel application
    InstallApp,

    /// Re-label leftover cluster objects so Helm can manage them
    Adopt {
        /// Only report objects that are not owned by their release
        #[arg(long)]
        verify: bool,
    },

    /// Show releases and pod readiness
    Status,

    /// Probe the services through the gateway
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print in-cluster service endpoints as shell exports
    Env,

    /// Uninstall every release in reverse order
    Cleanup {
        /// Delete the namespace as well
        #[arg(long)]
        delete_namespace: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "flywheel",
            "cleanup",
            "--delete-namespace",
            "--namespace",
            "dfw",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.namespace.as_deref(), Some("dfw"));
        assert!(cli.dry_run);
        assert!(matches!(cli.command, Commands::Cleanup { delete_namespace: true }));
    }
}
