//! Outbound email messages and delivery bookkeeping.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::Notifier;

/// One email to send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Errors that can occur when delivering email.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("email provider returned {status}")]
    Provider {
        status: u16,
        /// Provider body: JSON when it sent JSON, otherwise the text.
        body: serde_json::Value,
    },

    /// Client could not be configured.
    #[error("invalid email configuration: {0}")]
    Config(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// Who a notification was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Customer,
    Fulfillment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

/// Outcome of one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notification {
    #[must_use]
    pub const fn sent(recipient: Recipient) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Sent,
            detail: None,
        }
    }

    #[must_use]
    pub fn failed(recipient: Recipient, detail: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn skipped(recipient: Recipient, detail: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Skipped,
            detail: Some(detail.into()),
        }
    }
}

/// Per-recipient outcomes of the notify phase of an operation.
///
/// Reported alongside the committed order; a failure here never undoes the
/// write that preceded it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NotificationReport(pub Vec<Notification>);

impl NotificationReport {
    pub fn push(&mut self, notification: Notification) {
        self.0.push(notification);
    }

    #[must_use]
    pub fn get(&self, recipient: Recipient) -> Option<&Notification> {
        self.0.iter().find(|n| n.recipient == recipient)
    }

    #[must_use]
    pub fn all_sent(&self) -> bool {
        self.0.iter().all(|n| n.status == DeliveryStatus::Sent)
    }
}

/// Notifier used when no email provider is configured. Logs and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<serde_json::Value, NotifyError> {
        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            "Email not sent (no provider configured)"
        );
        Ok(serde_json::json!({ "logged": true }))
    }
}
