//! `PostgreSQL` order store.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database. Structured parts of the order (addresses, line
//! items, proof, tracking) live in JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use orderflow_core::{
    Address, Customer, Email, LineItem, Money, Order, OrderCode, OrderId, OrderStatus,
    PaymentMethod, ProofReference, Tracking,
};

use super::RepositoryError;
use crate::services::{OrderStore, UpdateOutcome};

/// Name of the unique constraint on `orders.code`.
const CODE_CONSTRAINT: &str = "orders_code_key";

const SELECT_ORDER: &str = r"
    SELECT id, code, status, customer_email, customer_name, customer_phone,
           shipping, billing, items, total, client_total, total_mismatch,
           payment_method, payment_proof, tracking, created_at, updated_at
    FROM orders
";

/// Order store backed by the `orders` table.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders (
                id, code, status, customer_email, customer_name, customer_phone,
                shipping, billing, items, total, client_total, total_mismatch,
                payment_method, payment_proof, tracking, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ",
        )
        .bind(order.id.as_uuid())
        .bind(order.code.as_str())
        .bind(order.status.as_str())
        .bind(order.customer.email.as_str())
        .bind(order.customer.name.as_deref())
        .bind(order.customer.phone.as_deref())
        .bind(Json(&order.shipping))
        .bind(Json(&order.billing))
        .bind(Json(&order.items))
        .bind(order.total.amount())
        .bind(order.client_total.map(|t| t.amount()))
        .bind(order.total_mismatch)
        .bind(order.payment_method.as_str())
        .bind(order.payment_proof.as_ref().map(Json))
        .bind(order.tracking.as_ref().map(Json))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                if db_err.constraint() == Some(CODE_CONSTRAINT) {
                    return RepositoryError::DuplicateCode;
                }
                return RepositoryError::Conflict(format!("order {} already exists", order.id));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(OrderRow::into_domain).transpose()
    }

    async fn find_by_code(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE code = $1"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(OrderRow::into_domain).transpose()
    }

    async fn update(
        &self,
        expected: OrderStatus,
        order: &Order,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $3, payment_proof = $4, tracking = $5, updated_at = $6
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(order.id.as_uuid())
        .bind(expected.as_str())
        .bind(order.status.as_str())
        .bind(order.payment_proof.as_ref().map(Json))
        .bind(order.tracking.as_ref().map(Json))
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(UpdateOutcome::Updated);
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                .bind(order.id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Ok(UpdateOutcome::NotFound),
            Some(status) => Ok(UpdateOutcome::StatusChanged(parse_status(&status)?)),
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    code: String,
    status: String,
    customer_email: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    shipping: Json<Address>,
    billing: Json<Address>,
    items: Json<Vec<LineItem>>,
    total: Decimal,
    client_total: Option<Decimal>,
    total_mismatch: bool,
    payment_method: String,
    payment_proof: Option<Json<ProofReference>>,
    tracking: Option<Json<Tracking>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_domain(self) -> Result<Order, RepositoryError> {
        let code = OrderCode::parse(&self.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order code in database: {e}"))
        })?;
        let email = Email::parse(&self.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let payment_method = PaymentMethod::parse(&self.payment_method).ok_or_else(|| {
            RepositoryError::DataCorruption("empty payment method in database".to_owned())
        })?;

        Ok(Order {
            id: OrderId::from_uuid(self.id),
            code,
            status: parse_status(&self.status)?,
            customer: Customer {
                email,
                name: self.customer_name,
                phone: self.customer_phone,
            },
            shipping: self.shipping.0,
            billing: self.billing.0,
            items: self.items.0,
            total: Money::new(self.total),
            client_total: self.client_total.map(Money::new),
            total_mismatch: self.total_mismatch,
            payment_method,
            payment_proof: self.payment_proof.map(|p| p.0),
            tracking: self.tracking.map(|t| t.0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse().map_err(RepositoryError::DataCorruption)
}
