//! JSON body extractor with the API's error shape.
//!
//! axum's `Json` rejects with plain-text bodies and insists on a
//! `Content-Type` header. Checkout clients are not always careful about
//! either, so bodies are parsed regardless of content type. Syntax errors
//! become [`AppError::MalformedBody`]; well-formed JSON of the wrong shape
//! becomes a validation error on `body`. An empty body reads as `{}`.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use orderflow_core::ValidationError;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::AppError;

/// A JSON request body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::BodyTooLarge
            } else {
                AppError::MalformedBody
            }
        })?;

        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(body).map(Self).map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            match e.classify() {
                Category::Data => AppError::Validation(ValidationError::invalid(
                    "body",
                    shape_message(&e),
                )),
                Category::Io | Category::Syntax | Category::Eof => AppError::MalformedBody,
            }
        })
    }
}

/// serde's message without the `at line 1 column 9` suffix.
fn shape_message(err: &serde_json::Error) -> String {
    let message = err.to_string();
    match message.rfind(" at line ") {
        Some(index) => message.get(..index).unwrap_or(&message).to_owned(),
        None => message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Ping {
        #[allow(dead_code)]
        to: Option<String>,
    }

    async fn extract(body: &'static str) -> Result<JsonBody<Ping>, AppError> {
        let request = Request::builder().body(Body::from(body)).unwrap();
        JsonBody::<Ping>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn test_syntax_error_is_malformed() {
        assert!(matches!(extract("{oops").await, Err(AppError::MalformedBody)));
        assert!(matches!(extract("{\"to\":").await, Err(AppError::MalformedBody)));
    }

    #[tokio::test]
    async fn test_wrong_shape_names_body() {
        let Err(AppError::Validation(err)) = extract("{\"to\": 5}").await else {
            panic!("expected validation error");
        };
        assert_eq!(err.fields(), vec!["body"]);
        assert!(!err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_blank_body_reads_as_empty_object() {
        assert!(extract("  \n").await.is_ok());
    }
}
