//! Order persistence trait and in-memory implementation.
//!
//! [`OrderStore`] is the seam between the ledger and storage. Production uses
//! [`crate::db::orders::PgOrderStore`]; tests use [`InMemoryOrderStore`] so
//! ledger semantics can be exercised without a database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use saltfern_core::{OrderId, OrderStatus, PaymentSessionId};

use crate::db::RepositoryError;
use crate::orders::model::Order;

/// Storage operations the order ledger needs.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Look up an order by its payment session id.
    async fn get_by_payment_session_id(
        &self,
        payment_session_id: &PaymentSessionId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Look up an order by its internal id.
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Insert a new order.
    ///
    /// Returns [`RepositoryError::Conflict`] when an order with the same
    /// payment session id already exists.
    async fn insert(&self, order: Order) -> Result<Order, RepositoryError>;

    /// Atomically move an order from `from` to `to`.
    ///
    /// The update only applies when the stored status still equals `from`;
    /// otherwise `Ok(None)` is returned and the row is untouched. Provider
    /// fields overwrite only when `Some`, so a transition without fresh
    /// provider data keeps whatever was recorded before.
    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        provider_status: Option<&str>,
        provider_order_id: Option<&str>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Total number of orders.
    async fn count(&self) -> Result<i64, RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// In-memory [`OrderStore`] used by unit and integration tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<Mutex<Vec<Order>>>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_by_payment_session_id(
        &self,
        payment_session_id: &PaymentSessionId,
    ) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .iter()
            .find(|order| order.payment_session_id == *payment_session_id)
            .cloned())
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders.iter().find(|order| order.id == id).cloned())
    }

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        // Uniqueness check and push happen under one lock, matching the
        // database unique constraint on payment_session_id.
        let mut orders = self.orders.lock().await;
        if orders
            .iter()
            .any(|existing| existing.payment_session_id == order.payment_session_id)
        {
            return Err(RepositoryError::Conflict(
                "payment session already has an order".to_string(),
            ));
        }
        orders.push(order.clone());
        Ok(order)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        provider_status: Option<&str>,
        provider_order_id: Option<&str>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.lock().await;
        let Some(order) = orders
            .iter_mut()
            .find(|order| order.id == id && order.status == from)
        else {
            return Ok(None);
        };

        order.status = to;
        if let Some(status) = provider_status {
            order.provider_status = Some(status.to_string());
        }
        if let Some(provider_id) = provider_order_id {
            order.provider_order_id = Some(provider_id.to_string());
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let orders = self.orders.lock().await;
        #[allow(clippy::cast_possible_wrap)]
        let count = orders.len() as i64;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
