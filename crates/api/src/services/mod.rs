//! Order lifecycle service and the collaborators it talks to.
//!
//! The lifecycle depends on three ports, each a trait object so the HTTP
//! layer, the CLI and the tests can plug in different adapters:
//!
//! - [`OrderStore`] - persistence ([`crate::db`])
//! - [`Notifier`] - outbound email ([`mailgun::MailgunClient`], [`notifier::LogNotifier`])
//! - [`ProofStore`] - payment-proof blobs ([`proof_store`])

pub mod codes;
pub mod emails;
pub mod lifecycle;
pub mod mailgun;
pub mod notifier;
pub mod proof_store;

use std::sync::Arc;

use async_trait::async_trait;
use orderflow_core::{Order, OrderCode, OrderId, OrderRef, OrderStatus};

use crate::config::ApiConfig;
use crate::db::RepositoryError;

pub use codes::{CodeGenerator, RandomCodeGenerator};
pub use emails::EmailComposer;
pub use lifecycle::{LifecycleError, OrderLifecycle};
pub use mailgun::MailgunClient;
pub use notifier::{
    DeliveryStatus, EmailMessage, LogNotifier, Notification, NotificationReport, NotifyError,
    Recipient,
};
pub use proof_store::{FsProofStore, MemoryProofStore, ProofStoreError};

/// Result of a compare-and-set update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The order was written.
    Updated,
    /// No order has this id.
    NotFound,
    /// Someone else changed the status first; holds the status now stored.
    StatusChanged(OrderStatus),
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order.
    ///
    /// Fails with [`RepositoryError::DuplicateCode`] when the code is taken;
    /// nothing is written in that case.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn find_by_code(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError>;

    /// Overwrite the mutable fields of `order` if its stored status is still
    /// `expected`.
    async fn update(
        &self,
        expected: OrderStatus,
        order: &Order,
    ) -> Result<UpdateOutcome, RepositoryError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn resolve(&self, order_ref: &OrderRef) -> Result<Option<Order>, RepositoryError> {
        match order_ref {
            OrderRef::Id(id) => self.get(*id).await,
            OrderRef::Code(code) => self.find_by_code(code).await,
        }
    }
}

/// Outbound transactional email.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message, returning the provider's response body.
    async fn send(&self, message: &EmailMessage) -> Result<serde_json::Value, NotifyError>;
}

/// Blob storage for payment-proof images.
#[async_trait]
pub trait ProofStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>)
    -> Result<(), ProofStoreError>;

    /// Remove a blob. Removing a key that is not stored succeeds.
    async fn delete(&self, key: &str) -> Result<(), ProofStoreError>;
}

/// Mailgun when configured, otherwise a notifier that only logs.
///
/// # Errors
///
/// Returns an error if the Mailgun HTTP client cannot be built.
pub fn default_notifier(config: &ApiConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.mailgun {
        Some(mailgun) => Ok(Arc::new(MailgunClient::new(mailgun)?)),
        None => {
            tracing::warn!("Mailgun not configured; notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
