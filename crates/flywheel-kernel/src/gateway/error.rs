//! Gateway error types for `flywheel-kernel`.
//!
//! [`GatewayError`] covers every failure mode that can be detected at
//! *definition time* — empty IDs, duplicate prefixes, missing backend
//! references, a missing or doubled catch-all — before any network I/O
//! occurs. Runtime failures (unresolvable backend, connection refused,
//! upstream timeout) belong in `flywheel-gateway`.

use thiserror::Error;

/// Configuration error type for the gateway contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Identity ────────────────────────────────────────────────────────────
    /// The gateway configuration `id` field is empty or whitespace-only.
    #[error("gateway id cannot be empty")]
    EmptyGatewayId,

    // ── Routes ───────────────────────────────────────────────────────────────
    /// The configuration contains no routes.
    #[error("gateway config must define at least one route")]
    NoRoutes,

    /// A route `id` field is empty or whitespace-only.
    #[error("route id cannot be empty")]
    EmptyRouteId,

    /// A route with this id has already been registered.
    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    /// Two routes share the same path prefix.
    #[error("path prefix '{0}' is claimed by more than one route")]
    DuplicatePrefix(String),

    /// A route references a backend id that is not present in the backend list.
    #[error("route '{0}' references unknown backend '{1}'")]
    UnknownBackend(String, String),

    /// A route path prefix is syntactically invalid.
    #[error("route '{0}' has an invalid path prefix: {1}")]
    InvalidPathPrefix(String, String),

    /// The catch-all route carries a method restriction, so some unmatched
    /// requests would have no default backend.
    #[error("catch-all route '{0}' cannot restrict methods")]
    RestrictedDefaultRoute(String),

    /// No route uses the catch-all prefix `/`.
    #[error("gateway config must define exactly one catch-all route with prefix '/'")]
    MissingDefaultRoute,

    // ── Backends ─────────────────────────────────────────────────────────────
    /// The configuration contains no backends.
    #[error("gateway config must define at least one backend")]
    NoBackends,

    /// A backend `id` field is empty or whitespace-only.
    #[error("backend id cannot be empty")]
    EmptyBackendId,

    /// A backend with this id has already been registered.
    #[error("backend '{0}' is already registered")]
    DuplicateBackend(String),

    /// No backend with this id is currently registered.
    #[error("backend '{0}' is not registered")]
    BackendNotFound(String),

    /// A backend reference is incomplete (empty service, zero port, bad scheme).
    #[error("backend '{0}' is invalid: {1}")]
    InvalidBackend(String, String),

    // ── Mocks ────────────────────────────────────────────────────────────────
    /// A mock rule `id` field is empty or whitespace-only.
    #[error("mock rule id cannot be empty")]
    EmptyMockId,

    /// A mock rule with this id has already been registered.
    #[error("mock rule '{0}' is already registered")]
    DuplicateMock(String),

    /// A mock rule is malformed (bad pattern or status code).
    #[error("mock rule '{0}' is invalid: {1}")]
    InvalidMock(String, String),

    // ── Timeouts ─────────────────────────────────────────────────────────────
    /// `request_timeout_ms` is zero, which would reject every request.
    #[error("request timeout must be greater than 0 ms")]
    InvalidTimeout,
}
