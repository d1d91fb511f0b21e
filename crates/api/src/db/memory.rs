//! In-memory order store.

use std::collections::HashMap;

use async_trait::async_trait;
use orderflow_core::{Order, OrderCode, OrderId, OrderStatus};
use tokio::sync::RwLock;

use super::RepositoryError;
use crate::services::{OrderStore, UpdateOutcome};

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    codes: HashMap<OrderCode, OrderId>,
}

/// Order store backed by a process-local map.
///
/// Orders are lost on restart.
#[derive(Default)]
pub struct MemoryOrderStore {
    tables: RwLock<Tables>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.codes.contains_key(&order.code) {
            return Err(RepositoryError::DuplicateCode);
        }
        if tables.orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        tables.codes.insert(order.code.clone(), order.id);
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }

    async fn update(
        &self,
        expected: OrderStatus,
        order: &Order,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.orders.get_mut(&order.id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if stored.status != expected {
            return Ok(UpdateOutcome::StatusChanged(stored.status));
        }

        stored.status = order.status;
        stored.payment_proof.clone_from(&order.payment_proof);
        stored.tracking.clone_from(&order.tracking);
        stored.updated_at = order.updated_at;
        Ok(UpdateOutcome::Updated)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
