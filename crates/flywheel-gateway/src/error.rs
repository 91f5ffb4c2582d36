//! Runtime proxy error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flywheel_kernel::config::ConfigError;
use flywheel_kernel::gateway::GatewayError;
use serde_json::json;
use thiserror::Error;

/// Errors that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid gateway configuration: {0}")]
    Config(#[from] GatewayError),

    #[error("failed to load gateway config file: {0}")]
    ConfigFile(#[from] ConfigError),

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while serving a single request.
///
/// None of these are fatal to the gateway process: each one is turned into an
/// HTTP response for the caller and the next request starts from a clean
/// slate.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no route matched '{0}'")]
    NoRoute(String),

    #[error("route references unregistered backend '{0}'")]
    UnknownBackend(String),

    #[error("backend '{backend_id}' ({authority}) could not be resolved: {reason}")]
    Unresolvable {
        backend_id: String,
        authority: String,
        reason: String,
    },

    #[error("backend '{backend_id}' is unreachable: {source}")]
    Unreachable {
        backend_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend '{backend_id}' did not respond within {timeout_ms} ms")]
    Timeout { backend_id: String, timeout_ms: u64 },

    #[error("method '{0}' is not supported")]
    MethodNotAllowed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request rejected: {1}")]
    Rejected(u16, String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::UnknownBackend(_)
            | ProxyError::Unresolvable { .. }
            | ProxyError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Rejected(status, _) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::FORBIDDEN)
            }
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ProxyError::NoRoute(_) => "NO_ROUTE",
            ProxyError::UnknownBackend(_) => "UNKNOWN_BACKEND",
            ProxyError::Unresolvable { .. } => "BACKEND_UNRESOLVABLE",
            ProxyError::Unreachable { .. } => "BACKEND_UNREACHABLE",
            ProxyError::Timeout { .. } => "BACKEND_TIMEOUT",
            ProxyError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ProxyError::InvalidRequest(_) => "INVALID_REQUEST",
            ProxyError::Rejected(..) => "REJECTED",
            ProxyError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (self.status(), body).into_response()
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_body_carries_code_and_message() {
        let resp = ProxyError::Timeout {
            backend_id: "nim".into(),
            timeout_ms: 300,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["code"], "BACKEND_TIMEOUT");
        assert!(json["error"]["message"].as_str().unwrap().contains("nim"));
    }

    #[test]
    fn resolution_failures_are_bad_gateway() {
        let err = ProxyError::Unresolvable {
            backend_id: "df-api".into(),
            authority: "df-api-service.ns.svc.cluster.local:8000".into(),
            reason: "no such host".into(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ProxyError::UnknownBackend("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn rejection_keeps_filter_status() {
        assert_eq!(
            ProxyError::Rejected(429, "slow down".into()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
