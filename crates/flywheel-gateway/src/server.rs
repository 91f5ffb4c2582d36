//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires together the prefix router, mock responder, filter
//! pipeline, backend registry and forwarder into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`/`HEAD` | `/healthz` | Liveness check. Always `200 OK` with body `OK`. |
//! | `GET`  | `/gateway/routes` | Loaded routes, mocks and backends as JSON. |
//! | `ANY`  | everything else | Mock rules, then prefix routing to a backend. |

use crate::backend::{BackendResolver, DnsResolver, HttpForwarder, InMemoryBackendRegistry};
use crate::error::{ProxyError, ProxyResult, ServerError};
use crate::filter::FilterPipeline;
use crate::header;
use crate::router::{MockResponder, PrefixRouter};
use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use flywheel_kernel::gateway::{
    BackendHealth, BackendRegistry, FilterAction, GatewayConfig, GatewayContext, GatewayRequest,
    GatewayResponse, GatewayRouter, HttpMethod,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on a buffered request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every axum handler via [`State`] extractor.
#[derive(Clone)]
pub struct AppState {
    gateway_id: Arc<str>,
    /// Immutable once built; only backend health changes at runtime.
    router: Arc<PrefixRouter>,
    mocks: Arc<MockResponder>,
    registry: Arc<RwLock<InMemoryBackendRegistry>>,
    pipeline: Arc<FilterPipeline>,
    forwarder: Arc<HttpForwarder>,
    request_timeout_ms: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
#[derive(Debug, Clone)]
pub struct GatewayServerConfig {
    /// Interface to bind (default: `0.0.0.0`).
    pub host: String,
    /// TCP port to listen on (default: 8080).
    pub port: u16,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level gateway server.
pub struct GatewayServer {
    config: GatewayServerConfig,
    resolver: Arc<dyn BackendResolver>,
}

impl GatewayServer {
    /// Create a server that resolves backends through DNS.
    pub fn new(config: GatewayServerConfig) -> Self {
        Self {
            config,
            resolver: Arc::new(DnsResolver),
        }
    }

    /// Replace the backend resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn BackendResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Build the axum [`Router`] wired to the provided [`GatewayConfig`].
    ///
    /// Validates the config first. No backend is contacted here; addresses
    /// are resolved per request.
    pub fn build_app(&self, gateway_cfg: &GatewayConfig) -> Result<Router, ServerError> {
        gateway_cfg.validate()?;

        let router = PrefixRouter::from_rules(gateway_cfg.routes.iter().cloned())?;

        let mut registry = InMemoryBackendRegistry::new();
        for backend in &gateway_cfg.backends {
            registry.register(backend.clone())?;
        }

        let state = AppState {
            gateway_id: Arc::from(gateway_cfg.id.as_str()),
            router: Arc::new(router),
            mocks: Arc::new(MockResponder::new(gateway_cfg.mocks.clone())),
            registry: Arc::new(RwLock::new(registry)),
            pipeline: Arc::new(FilterPipeline::standard()),
            forwarder: Arc::new(HttpForwarder::new(self.resolver.clone())?),
            request_timeout_ms: gateway_cfg.request_timeout_ms,
        };

        Ok(Router::new()
            .route("/healthz", get(healthz_handler))
            .route("/gateway/routes", get(list_routes_handler))
            .fallback(proxy_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }

    /// Bind and serve until Ctrl-C or SIGTERM.
    pub async fn start(self, gateway_cfg: GatewayConfig) -> Result<(), ServerError> {
        let app = self.build_app(&gateway_cfg)?;
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!(
            addr = %addr,
            gateway = %gateway_cfg.id,
            routes = gateway_cfg.routes.len(),
            mocks = gateway_cfg.mocks.len(),
            "gateway listening"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "shutdown listener failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM listener failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /healthz`. Never touches a backend.
async fn healthz_handler() -> &'static str {
    "OK"
}

/// `GET /gateway/routes`
async fn list_routes_handler(State(state): State<AppState>) -> impl IntoResponse {
    let routes: Vec<serde_json::Value> = state
        .router
        .routes()
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "path_prefix": r.path_prefix,
                "backend_id": r.backend_id,
                "methods": r.methods,
                "timeout_ms": r.timeout_ms,
            })
        })
        .collect();

    let mocks: Vec<serde_json::Value> = state
        .mocks
        .rules()
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "path_pattern": m.path_pattern,
                "methods": m.methods,
                "status": m.status,
            })
        })
        .collect();

    let registry = state.registry.read().await;
    let backends: Vec<serde_json::Value> = registry
        .list_all()
        .iter()
        .map(|b| {
            json!({
                "id": b.id,
                "url": b.base_url(),
                "health": registry.health(&b.id).map(|h| format!("{h:?}")),
            })
        })
        .collect();

    Json(json!({
        "gateway": &*state.gateway_id,
        "routes": routes,
        "mocks": mocks,
        "backends": backends,
    }))
}

/// Fallback handler: every path not claimed above is mocked or proxied.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match dispatch(&state, request_id.clone(), request).await {
        Ok(resp) => build_axum_response(resp),
        Err(err) => {
            warn!(request_id = %request_id, status = err.status().as_u16(), error = %err, "request failed");
            err.into_response()
        }
    }
}

async fn dispatch(
    state: &AppState,
    request_id: String,
    request: Request,
) -> ProxyResult<GatewayResponse> {
    let (parts, body) = request.into_parts();

    let method = HttpMethod::from_str_ci(parts.method.as_str())
        .ok_or_else(|| ProxyError::MethodNotAllowed(parts.method.to_string()))?;
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("failed to read body: {e}")))?;

    let mut req = GatewayRequest::new(request_id, path, method).with_body(body.to_vec());
    for (name, value) in &parts.headers {
        req = req.with_header(name.as_str(), header::value_to_text(value));
    }
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        req = req.with_client_addr(addr.ip().to_string());
    }

    let mut ctx = GatewayContext::new(req);

    // Mocks shadow proxy rules.
    let mocked = state
        .mocks
        .find(&ctx.request.method, &ctx.request.path)
        .map(|m| m.response());
    if mocked.is_none() {
        let route_match = state
            .router
            .resolve(&ctx.request.path, &ctx.request.method)
            .ok_or_else(|| ProxyError::NoRoute(ctx.request.path_only().to_string()))?;
        ctx.route_match = Some(route_match);
    }

    let action = state
        .pipeline
        .run_request(&mut ctx)
        .await
        .map_err(|e| ProxyError::Internal(e.to_string()))?;
    if let FilterAction::Reject(status, msg) = action {
        return Err(ProxyError::Rejected(status, msg));
    }

    let mut resp = match mocked {
        Some(resp) => resp,
        None => forward(state, &ctx).await?,
    };

    if let Err(err) = state.pipeline.run_response(&ctx, &mut resp).await {
        warn!(
            request_id = %ctx.request.id,
            error = %err,
            "response filter pipeline error (response still returned)"
        );
    }
    Ok(resp)
}

async fn forward(state: &AppState, ctx: &GatewayContext) -> ProxyResult<GatewayResponse> {
    let route_match = ctx
        .route_match
        .as_ref()
        .ok_or_else(|| ProxyError::Internal("request reached forwarding unrouted".to_string()))?;

    let backend = state
        .registry
        .read()
        .await
        .lookup(&route_match.backend_id)
        .cloned()
        .ok_or_else(|| ProxyError::UnknownBackend(route_match.backend_id.clone()))?;

    let timeout_ms = if route_match.timeout_ms > 0 {
        route_match.timeout_ms
    } else {
        state.request_timeout_ms
    };

    let result = state.forwarder.forward(&backend, &ctx.request, timeout_ms).await;

    let health = match &result {
        Ok(_) => BackendHealth::Healthy,
        Err(e) => BackendHealth::Unreachable(e.to_string()),
    };
    if let Err(e) = state.registry.write().await.update_health(&backend.id, health) {
        debug!(backend = %backend.id, error = %e, "health update skipped");
    }

    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build_axum_response(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (k, v) in &resp.headers {
        match header::text_to_value(v) {
            Some(value) => builder = builder.header(k, value),
            None => debug!(header = %k, "dropping response header with illegal value"),
        }
    }
    builder.body(Body::from(resp.body)).unwrap_or_else(|e| {
        ProxyError::Internal(format!("invalid upstream response: {e}")).into_response()
    })
}
