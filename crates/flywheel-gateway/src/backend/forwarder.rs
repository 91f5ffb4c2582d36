//! HTTP forwarder.
//!
//! [`HttpForwarder`] relays a [`GatewayRequest`] to a resolved backend and
//! returns the upstream answer verbatim, 4xx and 5xx included. It never
//! follows redirects and never rewrites bodies.

use super::resolver::BackendResolver;
use crate::error::{ProxyError, ProxyResult};
use crate::header;
use flywheel_kernel::gateway::{BackendRef, GatewayRequest, GatewayResponse, HttpMethod};
use reqwest::{Client, Method, redirect};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Connection-scoped headers that must not cross the proxy (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Header names to drop: the fixed hop-by-hop set plus anything the
/// `Connection` header nominates.
fn hop_by_hop<'a>(headers: impl Iterator<Item = (&'a str, &'a str)>) -> HashSet<String> {
    let mut skip: HashSet<String> = HOP_BY_HOP.iter().map(|h| h.to_string()).collect();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("connection") {
            skip.extend(
                value
                    .split(',')
                    .map(|t| t.trim().to_ascii_lowercase())
                    .filter(|t| !t.is_empty()),
            );
        }
    }
    skip
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

/// Forwards requests to backends over one shared connection pool.
pub struct HttpForwarder {
    client: Client,
    resolver: Arc<dyn BackendResolver>,
}

impl HttpForwarder {
    /// Build a forwarder with a redirect-free client.
    pub fn new(resolver: Arc<dyn BackendResolver>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client, resolver })
    }

    /// Forward `req` to `backend`, giving up after `timeout_ms`.
    #[instrument(skip(self, backend, req), fields(backend = %backend.id, request_id = %req.id))]
    pub async fn forward(
        &self,
        backend: &BackendRef,
        req: &GatewayRequest,
        timeout_ms: u64,
    ) -> ProxyResult<GatewayResponse> {
        let addr = self.resolver.resolve(backend).await?;

        // Plain http goes straight to the resolved address; https keeps the
        // host name so certificate validation sees it.
        let url = if backend.scheme == "https" {
            format!("{}{}", backend.base_url(), req.path)
        } else {
            format!("{}://{}{}", backend.scheme, addr, req.path)
        };
        debug!(url = %url, timeout_ms, "forwarding request");

        let skip = hop_by_hop(req.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let mut builder = self
            .client
            .request(to_reqwest_method(req.method), &url)
            .timeout(Duration::from_millis(timeout_ms));
        for (name, value) in &req.headers {
            if skip.contains(name) || name == "host" || name == "content-length" {
                continue;
            }
            match header::text_to_value(value) {
                Some(value) => builder = builder.header(name.as_str(), value),
                None => debug!(header = %name, "dropping request header with illegal value"),
            }
        }
        builder = builder.header("host", backend.authority());
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let start = Instant::now();
        let upstream = builder
            .send()
            .await
            .map_err(|e| self.classify(backend, timeout_ms, e))?;

        let status = upstream.status().as_u16();
        let upstream_headers: Vec<(String, String)> = upstream
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), header::value_to_text(v)))
            .collect();
        let skip = hop_by_hop(upstream_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let body = upstream
            .bytes()
            .await
            .map_err(|e| self.classify(backend, timeout_ms, e))?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut resp = GatewayResponse::new(status, &backend.id).with_body(body.to_vec());
        resp.headers = upstream_headers
            .into_iter()
            .filter(|(k, _)| !skip.contains(k))
            .collect();
        resp.latency_ms = latency_ms;
        Ok(resp)
    }

    fn classify(&self, backend: &BackendRef, timeout_ms: u64, err: reqwest::Error) -> ProxyError {
        if err.is_timeout() {
            ProxyError::Timeout {
                backend_id: backend.id.clone(),
                timeout_ms,
            }
        } else {
            ProxyError::Unreachable {
                backend_id: backend.id.clone(),
                source: err,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_header_nominates_extra_hop_headers() {
        let headers = [("connection", "close, X-Session"), ("x-other", "1")];
        let skip = hop_by_hop(headers.into_iter());
        assert!(skip.contains("x-session"));
        assert!(skip.contains("transfer-encoding"));
        assert!(!skip.contains("x-other"));
    }

    #[test]
    fn every_kernel_method_maps() {
        assert_eq!(to_reqwest_method(HttpMethod::Head), Method::HEAD);
        assert_eq!(to_reqwest_method(HttpMethod::Patch), Method::PATCH);
    }
}
