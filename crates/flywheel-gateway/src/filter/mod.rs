//! Filter module.

mod forwarded;
mod logger;

pub use forwarded::ForwardedHeadersFilter;
pub use logger::LoggingFilter;

use flywheel_kernel::gateway::{FilterAction, GatewayContext, GatewayError, GatewayFilter, GatewayResponse};
use std::sync::Arc;

/// Ordered list of boxed filters executed as a pipeline.
///
/// Filters are sorted by [`FilterOrder`](flywheel_kernel::gateway::FilterOrder)
/// in ascending order (lowest value runs first on the request path).
pub struct FilterPipeline {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline from a list of filters, sorted by their declared order.
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// The standard proxy pipeline: forwarding headers, then access logging.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(LoggingFilter::new()),
            Arc::new(ForwardedHeadersFilter::new()),
        ])
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run all filters' `on_request` hooks in ascending order.
    ///
    /// Short-circuits on the first action other than `Continue`.
    pub async fn run_request(
        &self,
        ctx: &mut GatewayContext,
    ) -> Result<FilterAction, GatewayError> {
        for filter in &self.filters {
            match filter.on_request(ctx).await? {
                FilterAction::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(FilterAction::Continue)
    }

    /// Run all filters' `on_response` hooks in descending order
    /// (outermost filter last, so it can finalize latency).
    pub async fn run_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        for filter in self.filters.iter().rev() {
            filter.on_response(ctx, resp).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flywheel_kernel::gateway::{FilterOrder, GatewayRequest, HttpMethod};

    struct Deny;

    #[async_trait]
    impl GatewayFilter for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        fn order(&self) -> FilterOrder {
            FilterOrder::PRE_PROXY
        }

        async fn on_request(&self, _ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
            Ok(FilterAction::Reject(403, "denied".into()))
        }

        async fn on_response(
            &self,
            _ctx: &GatewayContext,
            _resp: &mut GatewayResponse,
        ) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[test]
    fn standard_pipeline_orders_headers_before_logging() {
        assert_eq!(FilterPipeline::standard().names(), vec!["forwarded-headers", "access-log"]);
    }

    #[tokio::test]
    async fn reject_short_circuits() {
        let pipeline = FilterPipeline::new(vec![
            Arc::new(ForwardedHeadersFilter::new()),
            Arc::new(Deny),
        ]);
        let mut ctx = GatewayContext::new(
            GatewayRequest::new("r", "/v1/models", HttpMethod::Get).with_client_addr("10.0.0.9"),
        );
        let action = pipeline.run_request(&mut ctx).await.unwrap();
        assert_eq!(action, FilterAction::Reject(403, "denied".into()));
        // Deny runs first, so the headers filter never touched the request.
        assert!(ctx.request.header("x-forwarded-for").is_none());
    }
}
