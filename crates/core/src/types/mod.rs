//! Core types for orderflow.
//!
//! This module provides type-safe wrappers for the order domain.

pub mod address;
pub mod email;
pub mod id;
pub mod line_item;
pub mod order;
pub mod payment;
pub mod price;
pub mod proof;
pub mod status;
pub mod tracking;
pub mod validation;

pub use address::{Address, AddressFields, AddressRole};
pub use email::{Email, EmailError};
pub use id::{OrderCode, OrderCodeError, OrderId, OrderRef};
pub use line_item::{LineItem, order_total, parse_line_items};
pub use order::{CreateOrderRequest, Customer, NewOrder, Order, TotalCheck};
pub use payment::{PaymentMethod, payment_instructions};
pub use price::Money;
pub use proof::{
    DEFAULT_PROOF_MIME, DataUri, ProofError, ProofReference, proof_key, sanitize_key_segment,
};
pub use status::{OrderEvent, OrderStatus, TransitionError};
pub use tracking::Tracking;
pub use validation::{FieldError, FieldIssue, ValidationError};
