//! Flywheel CLI - install, adopt and verify the Data Flywheel stack

mod adopt;
mod cli;
mod cluster;
mod commands;
mod config;
mod error;
mod output;
mod preflight;
mod runner;
mod storage;
mod wait;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use config::DeployConfig;
use runner::{CommandRunner, DryRunRunner, ProcessRunner};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    let config = DeployConfig::load(&cli.env_file, cli.namespace.as_deref())?;

    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        Arc::new(DryRunRunner::new(ProcessRunner))
    } else {
        Arc::new(ProcessRunner)
    };
    let ctx = Context::new(config, runner);

    match cli.command {
        Commands::Bootstrap => commands::bootstrap::run(&ctx).await?,
        Commands::Clone => commands::clone::run(&ctx).await?,
        Commands::InstallNemo => commands::install::nemo(&ctx).await?,
        Commands::InstallInfra => commands::install::infra(&ctx).await?,
        Commands::InstallApp => commands::install::app(&ctx).await?,
        Commands::Adopt { verify } => commands::adopt::run(&ctx, verify).await?,
        Commands::Status => commands::status::run(&ctx).await?,
        Commands::Verify { json } => commands::verify::run(&ctx.config, json).await?,
        Commands::Cleanup { delete_namespace } => {
            commands::cleanup::run(&ctx, delete_namespace).await?
        }
        Commands::Env => commands::env::run(&ctx.config),
    }

    Ok(())
}
