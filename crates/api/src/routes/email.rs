//! Transactional email relay.

use axum::{Json, extract::State};
use orderflow_core::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::middleware::JsonBody;
use crate::services::{EmailMessage, Notifier};
use crate::state::AppState;

/// One address or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Addresses {
    One(String),
    Many(Vec<String>),
}

impl Addresses {
    fn into_vec(self) -> Vec<String> {
        let all = match self {
            Self::One(address) => vec![address],
            Self::Many(addresses) => addresses,
        };
        all.into_iter()
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

fn addresses(value: Option<Addresses>) -> Vec<String> {
    value.map(Addresses::into_vec).unwrap_or_default()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct SendEmailRequest {
    pub to: Option<Addresses>,
    pub cc: Option<Addresses>,
    pub bcc: Option<Addresses>,
    #[serde(rename = "replyTo", alias = "reply_to")]
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl SendEmailRequest {
    /// Build the message, requiring `to`, `subject` and a body.
    ///
    /// # Errors
    ///
    /// Returns every missing field. A missing body is reported as `text`.
    pub fn into_message(self) -> std::result::Result<EmailMessage, ValidationError> {
        let mut errors = ValidationError::new();

        let to = addresses(self.to);
        if to.is_empty() {
            errors.push_missing("to");
        }
        let subject = non_blank(self.subject);
        if subject.is_none() {
            errors.push_missing("subject");
        }
        let text = non_blank(self.text);
        let html = non_blank(self.html);
        if text.is_none() && html.is_none() {
            errors.push_missing("text");
        }

        errors.into_result(())?;
        Ok(EmailMessage {
            to,
            cc: addresses(self.cc),
            bcc: addresses(self.bcc),
            reply_to: non_blank(self.reply_to),
            subject: subject.unwrap_or_default(),
            text,
            html,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub ok: bool,
    /// Provider response body.
    pub result: Value,
}

/// Send one email through the configured provider.
#[tracing::instrument(skip_all)]
pub async fn send(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>> {
    let Some(mailer) = state.mailer() else {
        return Err(AppError::Misconfigured(
            "missing MAILGUN_API_KEY, MAILGUN_DOMAIN, or MAILGUN_FROM".to_owned(),
        ));
    };

    let message = request.into_message()?;
    let result = mailer.send(&message).await?;

    Ok(Json(SendEmailResponse { ok: true, result }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(value: Value) -> SendEmailRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_and_list_recipients() {
        let message = request(json!({
            "to": "a@shop.test",
            "cc": ["b@shop.test", " "],
            "replyTo": "support@shop.test",
            "subject": "Hi",
            "html": "<p>Hi</p>"
        }))
        .into_message()
        .unwrap();
        assert_eq!(message.to, vec!["a@shop.test"]);
        assert_eq!(message.cc, vec!["b@shop.test"]);
        assert_eq!(message.reply_to.as_deref(), Some("support@shop.test"));
        assert_eq!(message.text, None);
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let err = request(json!({ "to": [] })).into_message().unwrap_err();
        assert_eq!(err.missing_fields(), vec!["to", "subject", "text"]);
    }
}
