//! The order lifecycle.
//!
//! [`OrderLifecycle`] owns every status change an order goes through:
//!
//! ```text
//! create_order ─▶ pending ─ attach_proof / confirm_payment ─▶ paid ─ assign_tracking ─▶ fulfilled
//! ```
//!
//! Each operation has two phases. The commit phase validates, applies the
//! transition and persists it with a compare-and-set on the previous status.
//! The notify phase then sends email and records the outcome in the result.
//! A notify failure is reported but never undoes the commit.

use std::sync::Arc;

use chrono::Utc;
use orderflow_core::{
    CreateOrderRequest, DataUri, NewOrder, Order, OrderEvent, OrderId, OrderRef, ProofError,
    ProofReference, Tracking, TransitionError, ValidationError, proof_key,
};
use thiserror::Error;

use super::emails::EmailComposer;
use super::notifier::{EmailMessage, Notification, NotificationReport, NotifyError, Recipient};
use super::proof_store::ProofStoreError;
use super::{CodeGenerator, Notifier, OrderStore, ProofStore, UpdateOutcome};
use crate::config::LifecycleConfig;
use crate::db::RepositoryError;

/// How many codes to try before giving up on an insert.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Errors returned by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Input failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No order matches the reference.
    #[error("order not found: {0}")]
    NotFound(String),

    /// The event is not allowed from the order's current status.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Code allocation exhausted, or a concurrent writer won.
    #[error("{0}")]
    Conflict(String),

    /// The order store failed.
    #[error("order store error: {0}")]
    Store(#[from] RepositoryError),

    /// The proof store failed.
    #[error("proof store error: {0}")]
    ProofStore(#[from] ProofStoreError),
}

impl From<ProofError> for LifecycleError {
    fn from(err: ProofError) -> Self {
        Self::Validation(err.into())
    }
}

/// A newly created order and the emails sent about it.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub notifications: NotificationReport,
}

/// An order after a transition that sends no email.
#[derive(Debug, Clone)]
pub struct Transitioned {
    pub order: Order,
    /// Whether the status moved. `false` for replays.
    pub changed: bool,
}

/// A stored payment proof and the order it was attached to.
#[derive(Debug, Clone)]
pub struct ProofAttached {
    /// Proof-store key.
    pub key: String,
    pub order: Order,
    pub changed: bool,
}

/// An order with tracking assigned and the shipping email outcome.
#[derive(Debug, Clone)]
pub struct TrackingAssigned {
    pub order: Order,
    pub notification: Notification,
}

/// Order lifecycle manager.
#[derive(Clone)]
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    proofs: Arc<dyn ProofStore>,
    codes: Arc<dyn CodeGenerator>,
    emails: EmailComposer,
    settings: LifecycleConfig,
}

impl OrderLifecycle {
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        proofs: Arc<dyn ProofStore>,
        codes: Arc<dyn CodeGenerator>,
        settings: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            proofs,
            codes,
            emails: EmailComposer::new(&settings),
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &LifecycleConfig {
        &self.settings
    }

    /// Validate and persist a new `pending` order, then email the customer
    /// and the fulfillment contact.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] with every failing field
    /// - [`LifecycleError::Conflict`] if no free code was found
    /// - [`LifecycleError::Store`] if the insert failed
    #[tracing::instrument(skip_all)]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, LifecycleError> {
        let new = request.validate(self.settings.default_country.as_deref())?;
        if new.total_mismatch {
            tracing::warn!(
                computed = %new.total,
                client = ?new.client_total.map(|t| t.to_string()),
                "Client total differs from computed total; keeping computed total"
            );
        }

        let order = self.insert_with_fresh_code(new).await?;
        tracing::info!(
            order_id = %order.id,
            code = %order.code,
            total = %order.total,
            method = %order.payment_method,
            "Order created"
        );

        let mut notifications = NotificationReport::default();
        notifications.push(
            self.deliver(Recipient::Customer, self.emails.order_received(&order))
                .await,
        );
        let fulfillment = match &self.settings.fulfillment_email {
            Some(to) => {
                self.deliver(
                    Recipient::Fulfillment,
                    self.emails.order_fulfillment(&order, to),
                )
                .await
            }
            None => Notification::skipped(
                Recipient::Fulfillment,
                "no fulfillment contact configured",
            ),
        };
        notifications.push(fulfillment);

        Ok(CreatedOrder {
            order,
            notifications,
        })
    }

    async fn insert_with_fresh_code(&self, new: NewOrder) -> Result<Order, LifecycleError> {
        let mut order = Order::new(OrderId::generate(), self.codes.generate(), new, Utc::now());
        let mut attempt = 1;
        loop {
            match self.store.insert(&order).await {
                Ok(()) => return Ok(order),
                Err(RepositoryError::DuplicateCode) if attempt < MAX_CODE_ATTEMPTS => {
                    tracing::debug!(attempt, code = %order.code, "Order code taken, retrying");
                    attempt += 1;
                    order.code = self.codes.generate();
                }
                Err(RepositoryError::DuplicateCode) => {
                    tracing::error!(attempts = attempt, "Could not allocate a unique order code");
                    return Err(LifecycleError::Conflict(format!(
                        "could not allocate a unique order code after {MAX_CODE_ATTEMPTS} attempts"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Store an uploaded payment proof and attach it to the order.
    ///
    /// The order moves to `paid` only when `proof_marks_paid` is set. The
    /// blob is written before the status commit and removed again if the
    /// commit fails.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] for a blank reference or a bad payload
    /// - [`LifecycleError::NotFound`] if the order does not exist
    /// - [`LifecycleError::InvalidTransition`] if the order already shipped
    /// - [`LifecycleError::Conflict`] if the status changed concurrently
    /// - [`LifecycleError::ProofStore`] if the blob could not be written
    #[tracing::instrument(skip(self, image_data), fields(size = image_data.len()))]
    pub async fn attach_proof(
        &self,
        order_ref: &str,
        image_data: &str,
    ) -> Result<ProofAttached, LifecycleError> {
        let mut errors = ValidationError::new();
        if order_ref.trim().is_empty() {
            errors.extend(ProofError::MissingOrderId.into());
        }
        if image_data.trim().is_empty() {
            errors.extend(ProofError::MissingPayload.into());
        }
        errors.into_result(())?;

        let upload = DataUri::decode(image_data, self.settings.max_proof_bytes)?;
        let key = proof_key(order_ref, Utc::now(), &upload.content_type)?;

        let order = self.resolve(order_ref).await?;
        let event = OrderEvent::ProofSubmitted {
            marks_paid: self.settings.proof_marks_paid,
        };
        order.status.apply(event)?;

        self.proofs
            .put(&key, &upload.content_type, upload.bytes)
            .await?;

        let proof = ProofReference::Stored {
            key: key.clone(),
            content_type: Some(upload.content_type),
        };
        let committed = self
            .commit(order, event, |order| order.payment_proof = Some(proof))
            .await;
        let Transitioned { order, changed } = match committed {
            Ok(transitioned) => transitioned,
            Err(e) => {
                if let Err(cleanup) = self.proofs.delete(&key).await {
                    tracing::warn!(error = %cleanup, key, "Failed to remove orphaned payment proof");
                }
                return Err(e);
            }
        };
        tracing::info!(order_id = %order.id, key, status = %order.status, "Payment proof attached");

        Ok(ProofAttached {
            key,
            order,
            changed,
        })
    }

    /// Operator confirmation that payment arrived.
    ///
    /// A new proof reference replaces the stored one; `None` keeps it.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] if the order does not exist
    /// - [`LifecycleError::InvalidTransition`] if the order already shipped
    /// - [`LifecycleError::Conflict`] if the status changed concurrently
    #[tracing::instrument(skip(self, proof))]
    pub async fn confirm_payment(
        &self,
        order_ref: &str,
        proof: Option<ProofReference>,
    ) -> Result<Transitioned, LifecycleError> {
        let order = self.resolve(order_ref).await?;
        let result = self
            .commit(order, OrderEvent::PaymentConfirmed, |order| {
                if let Some(proof) = proof {
                    order.payment_proof = Some(proof);
                }
            })
            .await?;
        tracing::info!(order_id = %result.order.id, changed = result.changed, "Payment confirmed");
        Ok(result)
    }

    /// Record shipment tracking and email the customer.
    ///
    /// Assigning again overwrites the tracking and sends another email.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] if the order does not exist
    /// - [`LifecycleError::InvalidTransition`] if the order is not paid yet
    /// - [`LifecycleError::Conflict`] if the status changed concurrently
    #[tracing::instrument(skip(self, tracking), fields(number = %tracking.number))]
    pub async fn assign_tracking(
        &self,
        order_ref: &str,
        tracking: Tracking,
    ) -> Result<TrackingAssigned, LifecycleError> {
        let order = self.resolve(order_ref).await?;
        let Transitioned { order, .. } = self
            .commit(order, OrderEvent::TrackingAssigned, |order| {
                order.tracking = Some(tracking);
            })
            .await?;
        tracing::info!(order_id = %order.id, "Tracking assigned");

        let notification = match &order.tracking {
            Some(tracking) => {
                self.deliver(
                    Recipient::Customer,
                    self.emails.order_shipped(&order, tracking),
                )
                .await
            }
            None => Notification::skipped(Recipient::Customer, "no tracking on order"),
        };

        Ok(TrackingAssigned {
            order,
            notification,
        })
    }

    /// Look up an order by id or code.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when the reference is neither a
    /// known id nor a known code.
    pub async fn resolve(&self, order_ref: &str) -> Result<Order, LifecycleError> {
        let order_ref = order_ref.trim();
        let parsed = OrderRef::parse(order_ref)
            .ok_or_else(|| LifecycleError::NotFound(order_ref.to_owned()))?;
        self.store
            .resolve(&parsed)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(order_ref.to_owned()))
    }

    /// Check the order store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn ping(&self) -> Result<(), LifecycleError> {
        Ok(self.store.ping().await?)
    }

    /// Apply `event`, let `edit` change the order, and write it back if the
    /// stored status is still the one we read.
    async fn commit(
        &self,
        mut order: Order,
        event: OrderEvent,
        edit: impl FnOnce(&mut Order) + Send,
    ) -> Result<Transitioned, LifecycleError> {
        let expected = order.status;
        let next = expected.apply(event)?;

        edit(&mut order);
        order.status = next;
        order.updated_at = Utc::now();

        match self.store.update(expected, &order).await? {
            UpdateOutcome::Updated => Ok(Transitioned {
                changed: next != expected,
                order,
            }),
            UpdateOutcome::NotFound => Err(LifecycleError::NotFound(order.id.to_string())),
            UpdateOutcome::StatusChanged(current) => {
                tracing::warn!(
                    order_id = %order.id,
                    %expected,
                    %current,
                    "Order changed concurrently"
                );
                Err(LifecycleError::Conflict(format!(
                    "order {} changed from {expected} to {current} concurrently",
                    order.code
                )))
            }
        }
    }

    /// Send one message, bounded by the notify timeout.
    async fn deliver(
        &self,
        recipient: Recipient,
        message: Result<EmailMessage, NotifyError>,
    ) -> Notification {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, ?recipient, "Failed to render email");
                return Notification::failed(recipient, e.to_string());
            }
        };

        match tokio::time::timeout(self.settings.notify_timeout, self.notifier.send(&message))
            .await
        {
            Ok(Ok(_)) => Notification::sent(recipient),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, ?recipient, "Notification failed");
                Notification::failed(recipient, e.to_string())
            }
            Err(_) => {
                tracing::warn!(?recipient, timeout = ?self.settings.notify_timeout, "Notification timed out");
                Notification::failed(recipient, "timed out")
            }
        }
    }
}
