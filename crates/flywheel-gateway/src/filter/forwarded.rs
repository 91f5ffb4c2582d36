//! `X-Forwarded-*` header filter.
//!
//! Appends the caller to `X-Forwarded-For` and records the original host and
//! scheme, so backends behind the gateway see the same headers an NGINX
//! `proxy_set_header` block would give them.

use async_trait::async_trait;
use flywheel_kernel::gateway::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
};

#[derive(Default)]
pub struct ForwardedHeadersFilter;

impl ForwardedHeadersFilter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayFilter for ForwardedHeadersFilter {
    fn name(&self) -> &str {
        "forwarded-headers"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::HEADERS
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let req = &mut ctx.request;

        if let Some(addr) = req.client_addr.clone() {
            let chain = match req.header("x-forwarded-for") {
                Some(prior) if !prior.trim().is_empty() => format!("{prior}, {addr}"),
                _ => addr,
            };
            req.set_header("x-forwarded-for", chain);
        }

        if req.header("x-forwarded-host").is_none()
            && let Some(host) = req.header("host").map(str::to_string)
        {
            req.set_header("x-forwarded-host", host);
        }

        if req.header("x-forwarded-proto").is_none() {
            req.set_header("x-forwarded-proto", "http");
        }

        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        _ctx: &GatewayContext,
        _resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flywheel_kernel::gateway::{GatewayRequest, HttpMethod};

    #[tokio::test]
    async fn sets_forwarded_headers() {
        let mut ctx = GatewayContext::new(
            GatewayRequest::new("r", "/v1/datasets", HttpMethod::Get)
                .with_header("Host", "gateway.example")
                .with_client_addr("10.1.2.3"),
        );
        ForwardedHeadersFilter::new().on_request(&mut ctx).await.unwrap();
        assert_eq!(ctx.request.header("x-forwarded-for"), Some("10.1.2.3"));
        assert_eq!(ctx.request.header("x-forwarded-host"), Some("gateway.example"));
        assert_eq!(ctx.request.header("x-forwarded-proto"), Some("http"));
    }

    #[tokio::test]
    async fn appends_to_existing_chain_and_keeps_proto() {
        let mut ctx = GatewayContext::new(
            GatewayRequest::new("r", "/", HttpMethod::Get)
                .with_header("X-Forwarded-For", "203.0.113.7")
                .with_header("X-Forwarded-Proto", "https")
                .with_client_addr("10.0.0.1"),
        );
        ForwardedHeadersFilter::new().on_request(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.request.header("x-forwarded-for"),
            Some("203.0.113.7, 10.0.0.1")
        );
        assert_eq!(ctx.request.header("x-forwarded-proto"), Some("https"));
    }
}
