//! HTTP middleware and extractors for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (answers `OPTIONS` itself)
//! 5. Body size limit
//!
//! Operator authentication is an extractor ([`RequireOperator`]) on the
//! privileged handlers rather than a layer.

pub mod auth;
pub mod cors;
pub mod json;
pub mod request_id;

pub use auth::RequireOperator;
pub use cors::{CorsPolicy, cors_middleware};
pub use json::JsonBody;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
