//! Order status and the lifecycle state machine.
//!
//! ```text
//! Submitted ─▶ pending ──ProofSubmitted / PaymentConfirmed──▶ paid ──TrackingAssigned──▶ fulfilled
//! ```
//!
//! Replaying the event that produced the current state is accepted and leaves
//! the status unchanged, so retried requests are harmless. Events that would
//! move the order backwards or skip a state are rejected.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where an order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OrderStatus {
    /// Submitted, awaiting payment.
    #[default]
    Pending,
    /// Payment received or confirmed.
    Paid,
    /// Shipped with tracking.
    #[serde(alias = "shipped")]
    Fulfilled,
}

impl OrderStatus {
    /// Stable lowercase name used in storage and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Fulfilled => "fulfilled",
        }
    }

    /// Apply an event, returning the resulting status.
    ///
    /// `ProofSubmitted { marks_paid: false }` attaches evidence without moving
    /// a pending order forward.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the event is not allowed from this
    /// status.
    pub const fn apply(self, event: OrderEvent) -> Result<Self, TransitionError> {
        let next = match (self, event) {
            (Self::Pending, OrderEvent::ProofSubmitted { marks_paid: false }) => Some(Self::Pending),
            (Self::Pending | Self::Paid, OrderEvent::ProofSubmitted { marks_paid: true })
            | (Self::Paid, OrderEvent::ProofSubmitted { marks_paid: false })
            | (Self::Pending | Self::Paid, OrderEvent::PaymentConfirmed) => Some(Self::Paid),
            (Self::Paid | Self::Fulfilled, OrderEvent::TrackingAssigned) => Some(Self::Fulfilled),
            _ => None,
        };

        match next {
            Some(status) => Ok(status),
            None => Err(TransitionError { from: self, event }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "fulfilled" | "shipped" => Ok(Self::Fulfilled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Something that happened to an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    /// Customer uploaded payment proof.
    ProofSubmitted {
        /// Whether proof alone is enough to mark the order paid.
        marks_paid: bool,
    },
    /// Operator confirmed the payment arrived.
    PaymentConfirmed,
    /// Operator attached shipment tracking.
    TrackingAssigned,
}

impl OrderEvent {
    /// Short name for logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProofSubmitted { .. } => "proof_submitted",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::TrackingAssigned => "tracking_assigned",
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event that is not allowed from the order's current status.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot apply {event} to an order that is {from}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub event: OrderEvent,
}
