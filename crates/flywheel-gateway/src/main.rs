//! Flywheel gateway entry point.
//!
//! Reads settings from the environment (see [`flywheel_gateway::settings`])
//! and serves until Ctrl-C or SIGTERM.

use anyhow::Context;
use flywheel_gateway::server::GatewayServer;
use flywheel_gateway::settings::GatewaySettings;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flywheel_gateway=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = GatewaySettings::from_env().context("reading gateway settings")?;
    let gateway_config = settings
        .gateway_config()
        .context("loading gateway route table")?;

    info!(
        port = settings.port,
        namespace = %settings.namespace,
        config = settings.config_path.as_deref().unwrap_or("<built-in>"),
        "flywheel gateway configuration loaded"
    );

    GatewayServer::new(settings.server_config())
        .start(gateway_config)
        .await
        .context("gateway server failed")?;
    Ok(())
}
