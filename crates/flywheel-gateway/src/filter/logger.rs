//! Structured access-logging filter.
//!
//! Emits `tracing` events on both the request and response path, recording
//! request id, method, path, route, backend, response status and round-trip
//! latency.

use async_trait::async_trait;
use flywheel_kernel::gateway::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const START_ATTR: &str = "log.request_start_ms";

/// Records inbound requests and outbound responses.
#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let route = ctx.route_match.as_ref().map(|m| m.route_id.as_str()).unwrap_or("-");
        info!(
            request_id = %ctx.request.id,
            method     = ctx.request.method.as_str(),
            path       = %ctx.request.path,
            route      = route,
            client     = ctx.request.client_addr.as_deref().unwrap_or("-"),
            "→ inbound request"
        );
        ctx.set_attr(START_ATTR, &now_ms());
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        let start_ms: u64 = ctx.get_attr(START_ATTR).unwrap_or(0);
        let elapsed = now_ms().saturating_sub(start_ms);

        // Upstream 5xx is relayed as-is, but worth a louder line.
        if resp.status >= 500 {
            warn!(
                request_id = %ctx.request.id,
                path       = %ctx.request.path,
                status     = resp.status,
                backend    = %resp.backend_id,
                latency_ms = elapsed,
                "← upstream error response"
            );
        } else {
            info!(
                request_id = %ctx.request.id,
                path       = %ctx.request.path,
                status     = resp.status,
                backend    = %resp.backend_id,
                latency_ms = elapsed,
                "← outbound response"
            );
        }

        resp.latency_ms = elapsed;
        Ok(())
    }
}

fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flywheel_kernel::gateway::{GatewayRequest, HttpMethod};

    #[tokio::test]
    async fn records_start_and_fills_latency() {
        let filter = LoggingFilter::new();
        let mut ctx = GatewayContext::new(GatewayRequest::new("r1", "/healthz", HttpMethod::Get));
        filter.on_request(&mut ctx).await.unwrap();
        assert!(ctx.get_attr::<u64>(START_ATTR).is_some());

        let mut resp = GatewayResponse::new(200, "datastore");
        resp.latency_ms = u64::MAX;
        filter.on_response(&ctx, &mut resp).await.unwrap();
        assert!(resp.latency_ms < 60_000);
    }
}
