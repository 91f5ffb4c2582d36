//! Gateway filter trait.
//!
//! Filters are sorted by their declared [`FilterOrder`] and executed in
//! ascending order on the request path and descending order on the response
//! path.
//!
//! ```text
//! Request  ──► PreProxy ──► Headers ──► Logging
//!                  (backend call happens here)
//! Response ◄── Logging ◄── Headers ◄── PreProxy
//! ```

use super::error::GatewayError;
use super::types::{GatewayContext, GatewayResponse};
use async_trait::async_trait;

/// Numeric ordering slot for a filter in the chain.
///
/// Filters with equal order values run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Runs before anything else (request id, client address capture).
    pub const PRE_PROXY: FilterOrder = FilterOrder(0);
    /// Header rewriting (`X-Forwarded-*`, `Host`).
    pub const HEADERS: FilterOrder = FilterOrder(300);
    /// Access logging — runs after all rewrites.
    pub const LOGGING: FilterOrder = FilterOrder(400);
}

/// Instruction returned by [`GatewayFilter::on_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the (possibly modified) request on.
    Continue,
    /// Short-circuit with the given HTTP status and message.
    Reject(u16, String),
}

/// Contract for a single filter in the gateway pipeline.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the chain. Lower values run first on the request path.
    fn order(&self) -> FilterOrder;

    /// Called before the request is forwarded.
    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError>;

    /// Called with the response before it is returned to the caller.
    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError>;
}
