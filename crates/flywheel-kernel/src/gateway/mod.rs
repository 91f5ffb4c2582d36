//! Gateway contract.
//!
//! This module defines the *trait interfaces and configuration types* for the
//! Flywheel gateway. No network code lives here — that belongs in
//! `flywheel-gateway`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              flywheel-kernel  (this module)                 │
//! │  GatewayRouter trait    BackendRegistry trait               │
//! │  GatewayFilter trait    GatewayConfig + validate()          │
//! │  RouteRule / BackendRef / MockRule   GatewayError           │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              flywheel-gateway  (runtime crate)              │
//! │  PrefixRouter: impl GatewayRouter                           │
//! │  InMemoryBackendRegistry: impl BackendRegistry              │
//! │  MockResponder, BackendResolver, HttpForwarder              │
//! │  GatewayServer  (axum HTTP server)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use flywheel_kernel::gateway::{BackendRef, GatewayConfig, RouteRule};
//!
//! let config = GatewayConfig::new("my-gateway")
//!     .with_backend(BackendRef::new("datastore", "nemodatastore-sample", "flywheel", 8000))
//!     .with_backend(BackendRef::new("df-api", "df-api-service", "flywheel", 8000))
//!     .with_route(RouteRule::new("datasets", "/v1/datasets", "datastore"))
//!     .with_route(RouteRule::catch_all("default", "df-api"));
//!
//! config.validate().expect("gateway config is valid");
//! ```

pub mod backend;
pub mod error;
pub mod filter;
pub mod mock;
pub mod presets;
pub mod router;
pub mod types;
pub mod validation;

pub use backend::{BackendHealth, BackendRef, BackendRegistry};
pub use error::GatewayError;
pub use filter::{FilterAction, FilterOrder, GatewayFilter};
pub use mock::MockRule;
pub use router::{CATCH_ALL_PREFIX, GatewayRouter, RouteRule};
pub use types::{GatewayContext, GatewayRequest, GatewayResponse, HttpMethod, RouteMatch};
pub use validation::GatewayConfig;
