//! Operator authentication.
//!
//! Privileged routes (mark-paid, tracking) take [`RequireOperator`] as an
//! argument. The request must carry `Authorization: Bearer <OPERATOR_TOKEN>`.
//! Without a configured token every request is rejected.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that requires the operator bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn confirm(_operator: RequireOperator, State(state): State<AppState>) -> Result<Json<Value>> {
///     // only reached with a valid token
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireOperator;

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            tracing::debug!("Missing operator token");
            return Err(AppError::Unauthorized);
        };

        if state.config().operator_token_matches(token) {
            Ok(Self)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected operator token");
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders/tracking");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("bearer   abc "))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
