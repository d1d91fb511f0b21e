//! Orderflow Core - Order domain types and lifecycle rules.
//!
//! This crate provides the types shared by every orderflow component:
//! - `api` - HTTP handlers and the order lifecycle service
//! - `cli` - Operator tooling for migrations and order management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Validation, total computation, address
//! normalization, payment instructions and the status state machine all live
//! here so they can be tested without any collaborator.
//!
//! # Modules
//!
//! - [`types`] - Newtypes and domain values (ids, order codes, emails, money,
//!   addresses, line items, payment methods, statuses, proofs, orders)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
