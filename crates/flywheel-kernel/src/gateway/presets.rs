//! Built-in route table for a Data Flywheel + NeMo Microservices namespace.
//!
//! Every platform service listens on port 8000 inside the namespace. The
//! application API (`df-api-service`) is the catch-all; it is usually
//! deployed after the gateway, which is fine because backends are resolved
//! per request.

use super::backend::BackendRef;
use super::mock::MockRule;
use super::router::RouteRule;
use super::types::HttpMethod;
use super::validation::GatewayConfig;

/// Port shared by the platform services.
pub const SERVICE_PORT: u16 = 8000;

/// Backend ids used by the built-in table.
pub mod backend_ids {
    pub const DATASTORE: &str = "datastore";
    pub const ENTITY_STORE: &str = "entity-store";
    pub const CUSTOMIZER: &str = "customizer";
    pub const EVALUATOR: &str = "evaluator";
    pub const GUARDRAILS: &str = "guardrails";
    pub const NIM: &str = "nim";
    pub const APP_API: &str = "df-api";
}

const DEPLOYMENT_LIST: &str = r#"{"data":[],"object":"list"}"#;
const DEPLOYMENT_READY: &str =
    r#"{"deployed":true,"status_details":{"status":"ready","description":"model is pre-deployed"}}"#;

impl GatewayConfig {
    /// Route table for the services of namespace `namespace`.
    pub fn data_flywheel(namespace: &str) -> Self {
        use backend_ids::*;

        let svc = |id: &str, service: &str| {
            BackendRef::new(id, service, namespace, SERVICE_PORT)
        };

        GatewayConfig::new("nemo-gateway")
            .with_backend(svc(DATASTORE, "nemodatastore-sample").with_health_check("/v1/health"))
            .with_backend(
                svc(ENTITY_STORE, "nemoentitystore-sample").with_health_check("/v1/health/ready"),
            )
            .with_backend(svc(CUSTOMIZER, "nemocustomizer-sample").with_health_check("/v1/health/ready"))
            .with_backend(svc(EVALUATOR, "nemoevaluator-sample").with_health_check("/v1/health/ready"))
            .with_backend(svc(GUARDRAILS, "nemoguardrails-sample").with_health_check("/v1/health"))
            .with_backend(svc(NIM, "meta-llama3-1b-instruct").with_health_check("/v1/health/ready"))
            .with_backend(svc(APP_API, "df-api-service").with_health_check("/health"))
            .with_route(RouteRule::new("datasets", "/v1/datasets", DATASTORE))
            .with_route(RouteRule::new("hf-api", "/v1/hf", DATASTORE))
            .with_route(RouteRule::new("namespaces", "/v1/namespaces", ENTITY_STORE))
            .with_route(RouteRule::new("projects", "/v1/projects", ENTITY_STORE))
            .with_route(RouteRule::new("models", "/v1/models", ENTITY_STORE))
            .with_route(
                RouteRule::new("customization", "/v1/customization", CUSTOMIZER)
                    .with_timeout_ms(120_000),
            )
            .with_route(
                RouteRule::new("evaluation", "/v1/evaluation", EVALUATOR).with_timeout_ms(120_000),
            )
            .with_route(RouteRule::new("guardrail", "/v1/guardrail", GUARDRAILS))
            .with_route(
                RouteRule::new("chat-completions", "/v1/chat/completions", NIM)
                    .with_timeout_ms(300_000),
            )
            .with_route(
                RouteRule::new("completions", "/v1/completions", NIM).with_timeout_ms(300_000),
            )
            .with_route(RouteRule::new("embeddings", "/v1/embeddings", NIM))
            .with_route(RouteRule::catch_all("default", APP_API))
            .with_mock(
                MockRule::json(
                    "list-deployments",
                    "/v1/deployment/model-deployments",
                    DEPLOYMENT_LIST,
                )
                .with_methods(vec![HttpMethod::Get]),
            )
            .with_mock(
                MockRule::json(
                    "create-deployment",
                    "/v1/deployment/model-deployments",
                    DEPLOYMENT_READY,
                )
                .with_methods(vec![HttpMethod::Post]),
            )
            .with_mock(MockRule::json(
                "deployment-status",
                "/v1/deployment/model-deployments/{namespace}/{name}",
                DEPLOYMENT_READY,
            ))
    }
}
