//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! POST /api/orders            - Create an order (public)
//! POST /api/orders/proof      - Upload payment proof (public)
//! POST /api/orders/mark-paid  - Confirm payment (operator)
//! POST /api/orders/tracking   - Assign tracking (operator)
//! POST /api/email             - Send a transactional email (public)
//! ```
//!
//! Other methods on these paths get `405` with a JSON body. `OPTIONS` never
//! reaches the router; the CORS middleware answers it.

pub mod email;
pub mod orders;

use axum::{
    Router,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/orders",
            post(orders::create).fallback(method_not_allowed),
        )
        .route(
            "/api/orders/proof",
            post(orders::upload_proof).fallback(method_not_allowed),
        )
        .route(
            "/api/orders/mark-paid",
            post(orders::mark_paid).fallback(method_not_allowed),
        )
        .route(
            "/api/orders/tracking",
            post(orders::update_tracking).fallback(method_not_allowed),
        )
        .route(
            "/api/email",
            post(email::send).fallback(method_not_allowed),
        )
}

async fn method_not_allowed(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        AppError::MethodNotAllowed.into_response()
    }
}
