//! Process settings read from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_PORT` | `8080` | TCP port to listen on. |
//! | `GATEWAY_HOST` | `0.0.0.0` | Interface to bind. |
//! | `GATEWAY_CONFIG` | *(none)* | Route table file (YAML/TOML/JSON). Replaces the built-in table. |
//! | `GATEWAY_NAMESPACE` | `default` | Namespace the built-in table points at. |
//! | `GATEWAY_REQUEST_TIMEOUT_MS` | *(from config)* | Default upstream timeout. |

use crate::error::ServerError;
use crate::server::GatewayServerConfig;
use flywheel_kernel::config::load_config;
use flywheel_kernel::gateway::GatewayConfig;
use tracing::info;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub config_path: Option<String>,
    pub namespace: String,
    pub request_timeout_ms: Option<u64>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        let server = GatewayServerConfig::default();
        Self {
            host: server.host,
            port: server.port,
            config_path: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            request_timeout_ms: None,
        }
    }
}

impl GatewaySettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(host) = get("GATEWAY_HOST") {
            settings.host = host;
        }
        if let Some(port) = get("GATEWAY_PORT") {
            settings.port = port.trim().parse().map_err(|_| ServerError::InvalidEnv {
                var: "GATEWAY_PORT",
                value: port.clone(),
            })?;
        }
        settings.config_path = get("GATEWAY_CONFIG");
        if let Some(ns) = get("GATEWAY_NAMESPACE") {
            settings.namespace = ns;
        }
        if let Some(ms) = get("GATEWAY_REQUEST_TIMEOUT_MS") {
            let parsed: u64 = ms.trim().parse().map_err(|_| ServerError::InvalidEnv {
                var: "GATEWAY_REQUEST_TIMEOUT_MS",
                value: ms.clone(),
            })?;
            settings.request_timeout_ms = Some(parsed);
        }
        Ok(settings)
    }

    pub fn server_config(&self) -> GatewayServerConfig {
        GatewayServerConfig {
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// The route table to serve: the configured file, or the built-in
    /// Data Flywheel table for `namespace`.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ServerError> {
        let mut cfg = match &self.config_path {
            Some(path) => {
                info!(path = %path, "loading gateway config file");
                load_config::<GatewayConfig>(path)?
            }
            None => GatewayConfig::data_flywheel(&self.namespace),
        };
        if let Some(ms) = self.request_timeout_ms {
            cfg.request_timeout_ms = ms;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
