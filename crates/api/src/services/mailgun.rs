//! Mailgun API client for transactional email.
//!
//! Messages go to `POST {base}/v3/{domain}/messages` as a form with HTTP
//! basic auth `api:<key>`. The base URL depends on the account region.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::Notifier;
use super::notifier::{EmailMessage, NotifyError};
use crate::config::MailgunConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Mailgun API client.
#[derive(Clone)]
pub struct MailgunClient {
    client: reqwest::Client,
    api_key: SecretString,
    messages_url: String,
    from: String,
}

impl MailgunClient {
    /// Create a new Mailgun client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MailgunConfig) -> Result<Self, NotifyError> {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_timeout(config: &MailgunConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("orderflow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            messages_url: messages_url(config.region.base_url(), &config.domain),
            from: config.from.clone(),
        })
    }

    /// Endpoint messages are posted to.
    #[must_use]
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl Notifier for MailgunClient {
    #[tracing::instrument(skip_all, fields(to = ?message.to, subject = %message.subject))]
    async fn send(&self, message: &EmailMessage) -> Result<serde_json::Value, NotifyError> {
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(&form_fields(&self.from, message))
            .send()
            .await?;

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    status = status.as_u16(),
                    error = %e,
                    "Failed to read Mailgun response body"
                );
                String::new()
            }
        };
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Mailgun rejected message");
            return Err(NotifyError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Email sent successfully");
        Ok(body)
    }
}

fn messages_url(base: &str, domain: &str) -> String {
    format!("{}/v3/{}/messages", base.trim_end_matches('/'), domain.trim())
}

/// Form parameters for one message. Empty optional fields are omitted.
fn form_fields(from: &str, message: &EmailMessage) -> Vec<(&'static str, String)> {
    let mut fields = vec![("from", from.to_owned()), ("to", message.to.join(", "))];
    if !message.cc.is_empty() {
        fields.push(("cc", message.cc.join(", ")));
    }
    if !message.bcc.is_empty() {
        fields.push(("bcc", message.bcc.join(", ")));
    }
    if let Some(reply_to) = &message.reply_to {
        fields.push(("h:Reply-To", reply_to.clone()));
    }
    fields.push(("subject", message.subject.clone()));
    if let Some(text) = &message.text {
        fields.push(("text", text.clone()));
    }
    if let Some(html) = &message.html {
        fields.push(("html", html.clone()));
    }
    fields
}
