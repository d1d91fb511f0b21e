//! Orderflow API library.
//!
//! The HTTP surface of the order lifecycle, as a library so the binary, the
//! CLI and the integration tests share one router and one set of services.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Order stores (`PostgreSQL`, in-memory)
//! - [`services`] - Lifecycle, email, proof storage
//! - [`routes`] / [`middleware`] - axum handlers, extractors and layers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{CorsPolicy, cors_middleware, request_id_middleware};
use crate::state::AppState;

/// Headroom over the proof limit for base64 inflation and the other fields.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest request body accepted, derived from the proof size limit.
#[must_use]
pub const fn body_limit(max_proof_bytes: usize) -> usize {
    max_proof_bytes
        .saturating_mul(4)
        .div_ceil(3)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

/// Build the application router with every layer except Sentry's.
pub fn app(state: AppState) -> Router {
    let cors = CorsPolicy::from_config(state.config());
    let limit = body_limit(state.config().lifecycle.max_proof_bytes);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(DefaultBodyLimit::max(limit))
        .layer(from_fn_with_state(cors, cors_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the order store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.lifecycle().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
