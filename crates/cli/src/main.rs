//! Orderflow CLI - Database migrations and order management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! orderflow migrate
//!
//! # Inspect an order
//! orderflow order show AB1234567
//!
//! # Confirm a payment that arrived out of band
//! orderflow order confirm-payment AB1234567
//!
//! # Ship it
//! orderflow order track AB1234567 --number 1Z999AA1 --carrier ups
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `order show` - Print an order as JSON
//! - `order confirm-payment` - Mark an order paid
//! - `order track` - Assign tracking and email the customer

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "orderflow")]
#[command(author, version, about = "Orderflow operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and advance orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Print an order as JSON
    Show {
        /// Order UUID or code
        order: String,
    },
    /// Mark an order paid
    ConfirmPayment {
        /// Order UUID or code
        order: String,

        /// Proof-store key or data URI to record with the payment
        #[arg(long)]
        proof: Option<String>,
    },
    /// Assign tracking and email the customer
    Track {
        /// Order UUID or code
        order: String,

        /// Tracking number
        #[arg(short, long)]
        number: String,

        /// Carrier (`usps`, `ups`, `fedex`, `dhl` get a tracking link)
        #[arg(short, long)]
        carrier: Option<String>,

        /// Tracking page, overriding the carrier's
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Order { action } => match action {
            OrderAction::Show { order } => commands::order::show(&order).await?,
            OrderAction::ConfirmPayment { order, proof } => {
                commands::order::confirm_payment(&order, proof.as_deref()).await?;
            }
            OrderAction::Track {
                order,
                number,
                carrier,
                url,
            } => {
                commands::order::track(&order, &number, carrier.as_deref(), url.as_deref())
                    .await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_track() {
        let cli = Cli::try_parse_from([
            "orderflow", "order", "track", "AB1234567", "--number", "1Z9", "--carrier", "ups",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Order {
            action: OrderAction::Track { order, number, carrier, url },
        } = cli.command
        else {
            panic!("expected order track");
        };
        assert_eq!(order, "AB1234567");
        assert_eq!(number, "1Z9");
        assert_eq!(carrier.as_deref(), Some("ups"));
        assert_eq!(url, None);
    }
}
