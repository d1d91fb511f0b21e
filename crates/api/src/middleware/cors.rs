//! CORS headers and preflight handling.
//!
//! Every response gets `Access-Control-Allow-Origin` (the configured origin,
//! or `*`). Any `OPTIONS` request is answered here with `204 No Content` and
//! the allowed methods and headers; it never reaches a handler.

use axum::{
    extract::{Request, State},
    http::{
        HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
        },
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::ApiConfig;

/// Allowed origin for browser clients.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origin: HeaderValue,
    /// Whether the origin is a single host rather than `*`.
    exact: bool,
}

impl CorsPolicy {
    /// Origin from `CORS_ORIGIN`. An unusable value falls back to `*`.
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        match config.cors_origin.as_deref().map(HeaderValue::from_str) {
            Some(Ok(origin)) => Self {
                origin,
                exact: true,
            },
            Some(Err(_)) => {
                tracing::warn!("CORS_ORIGIN is not a valid header value; allowing any origin");
                Self::any()
            }
            None => Self::any(),
        }
    }

    #[must_use]
    pub fn any() -> Self {
        Self {
            origin: HeaderValue::from_static("*"),
            exact: false,
        }
    }
}

/// Add CORS headers and answer `OPTIONS` directly.
pub async fn cors_middleware(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        let mut preflight = StatusCode::NO_CONTENT.into_response();
        let headers = preflight.headers_mut();
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        preflight
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, policy.origin.clone());
    if policy.exact {
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
    response
}
