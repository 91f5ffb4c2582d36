//! `flywheel-gateway`: path-prefix reverse proxy for the Data Flywheel.
//!
//! This crate provides the runtime implementations of the gateway contracts
//! defined in `flywheel_kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`GatewayRouter`](gateway::GatewayRouter) | [`router::PrefixRouter`] |
//! | [`BackendRegistry`](gateway::BackendRegistry) | [`backend::InMemoryBackendRegistry`] |
//! | [`GatewayFilter`](gateway::GatewayFilter) | [`filter::ForwardedHeadersFilter`], [`filter::LoggingFilter`] |
//!
//! Mock rules are served by [`router::MockResponder`] ahead of proxy rules,
//! and [`backend::HttpForwarder`] relays everything else. The
//! [`server::GatewayServer`] wires it all into an axum HTTP service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use flywheel_gateway::server::{GatewayServer, GatewayServerConfig};
//! use flywheel_kernel::gateway::GatewayConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = GatewayServer::new(GatewayServerConfig {
//!         port: 8080,
//!         ..Default::default()
//!     });
//!
//!     server
//!         .start(GatewayConfig::data_flywheel("flywheel"))
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod backend;
pub mod error;
pub mod filter;
pub mod header;
pub mod router;
pub mod server;
pub mod settings;

// Re-export the kernel gateway types for convenience.
pub use flywheel_kernel::gateway;
