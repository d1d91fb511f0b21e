//! Order management commands.
//!
//! # Usage
//!
//! ```bash
//! # Print an order as JSON
//! orderflow order show AB1234567
//!
//! # Confirm payment, optionally recording a proof reference
//! orderflow order confirm-payment AB1234567 --proof AB1234567-1700000000000.png
//!
//! # Assign tracking and email the customer
//! orderflow order track AB1234567 --number 1Z999AA1 --carrier ups
//! ```
//!
//! Orders can be referenced by UUID or by order code. These commands talk to
//! the `PostgreSQL` store directly and send email through Mailgun when it is
//! configured, exactly as the API would.

use std::sync::Arc;

use orderflow_api::config::{ApiConfig, ConfigError};
use orderflow_api::db::{self, PgOrderStore};
use orderflow_api::services::{
    DeliveryStatus, FsProofStore, LifecycleError, NotifyError, OrderLifecycle,
    RandomCodeGenerator, default_notifier,
};
use orderflow_core::{ProofReference, Tracking, ValidationError};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Email setup error: {0}")]
    Notifier(#[from] NotifyError),

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle wired to the `PostgreSQL` store.
async fn connect() -> Result<OrderLifecycle, OrderCommandError> {
    let config = ApiConfig::from_env()?;
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(OrderCommandError::MissingEnvVar("DATABASE_URL"))?;

    let pool = db::create_pool(database_url).await?;

    Ok(OrderLifecycle::new(
        Arc::new(PgOrderStore::new(pool)),
        default_notifier(&config)?,
        Arc::new(FsProofStore::new(&config.proof_store_dir)),
        Arc::new(RandomCodeGenerator),
        config.lifecycle.clone(),
    ))
}

/// Print an order as pretty JSON.
///
/// # Errors
///
/// Returns an error if the order does not exist or the store fails.
pub async fn show(order_ref: &str) -> Result<(), OrderCommandError> {
    let order = connect().await?.resolve(order_ref).await?;
    let json = serde_json::to_string_pretty(&order)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

/// Mark an order paid.
///
/// # Errors
///
/// Returns an error if the order does not exist or has already shipped.
pub async fn confirm_payment(order_ref: &str, proof: Option<&str>) -> Result<(), OrderCommandError> {
    let proof = proof.and_then(ProofReference::from_client);
    let result = connect().await?.confirm_payment(order_ref, proof).await?;

    #[allow(clippy::print_stdout)]
    {
        if result.changed {
            println!("Order {} marked paid", result.order.code);
        } else {
            println!("Order {} was already paid", result.order.code);
        }
    }
    Ok(())
}

/// Assign tracking and notify the customer.
///
/// # Errors
///
/// Returns an error if the tracking number is invalid, the order does not
/// exist, or the order is not paid yet.
pub async fn track(
    order_ref: &str,
    number: &str,
    carrier: Option<&str>,
    url: Option<&str>,
) -> Result<(), OrderCommandError> {
    let tracking = Tracking::new(number, carrier, url)?;
    let result = connect().await?.assign_tracking(order_ref, tracking).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Order {} is {}", result.order.code, result.order.status);
        if let Some(url) = result.order.tracking.as_ref().and_then(|t| t.url.as_deref()) {
            println!("  Tracking: {url}");
        }
        match result.notification.status {
            DeliveryStatus::Sent => println!("  Customer notified"),
            DeliveryStatus::Failed | DeliveryStatus::Skipped => println!(
                "  Customer NOT notified: {}",
                result.notification.detail.as_deref().unwrap_or("unknown reason")
            ),
        }
    }
    Ok(())
}
