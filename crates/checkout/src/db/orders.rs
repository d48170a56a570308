//! Order repository for database operations.
//!
//! Persists the order ledger in the `orders` table. The unique constraint on
//! `payment_session_id` is what makes [`crate::orders::OrderLedger`] creation
//! idempotent, and status changes are compare-and-set updates so concurrent
//! writers can never skip a lifecycle step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use saltfern_core::{Email, OrderId, OrderStatus, PaymentIntentId, PaymentSessionId};

use super::RepositoryError;
use crate::orders::model::{Order, ShippingAddress};
use crate::orders::store::OrderStore;
use crate::pricing::ValidatedLineItem;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    payment_session_id: String,
    payment_intent_id: Option<String>,
    customer_email: String,
    customer_name: String,
    shipping_address: serde_json::Value,
    items: serde_json::Value,
    total_amount: Decimal,
    currency: String,
    status: String,
    provider_status: Option<String>,
    provider_order_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let shipping_address: ShippingAddress = serde_json::from_value(row.shipping_address)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid shipping address in database: {e}"))
            })?;

        let items: Vec<ValidatedLineItem> = serde_json::from_value(row.items).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid line items in database: {e}"))
        })?;

        let currency = row.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;

        let status: OrderStatus = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::from_uuid(row.id),
            payment_session_id: PaymentSessionId::new(row.payment_session_id),
            payment_intent_id: row.payment_intent_id.map(PaymentIntentId::new),
            customer_email,
            customer_name: row.customer_name,
            shipping_address,
            items,
            total_amount: row.total_amount,
            currency,
            status,
            provider_status: row.provider_status,
            provider_order_id: row.provider_order_id,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed [`OrderStore`].
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn get_by_payment_session_id(
        &self,
        payment_session_id: &PaymentSessionId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, payment_session_id, payment_intent_id,
                   customer_email, customer_name, shipping_address, items,
                   total_amount, currency, status,
                   provider_status, provider_order_id, metadata,
                   created_at, updated_at
            FROM orders
            WHERE payment_session_id = $1
            ",
        )
        .bind(payment_session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, payment_session_id, payment_intent_id,
                   customer_email, customer_name, shipping_address, items,
                   total_amount, currency, status,
                   provider_status, provider_order_id, metadata,
                   created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        let shipping_address = serde_json::to_value(&order.shipping_address).map_err(|e| {
            RepositoryError::DataCorruption(format!("unserializable shipping address: {e}"))
        })?;
        let items = serde_json::to_value(&order.items)
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable items: {e}")))?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (
                id, payment_session_id, payment_intent_id,
                customer_email, customer_name, shipping_address, items,
                total_amount, currency, status,
                provider_status, provider_order_id, metadata,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id, payment_session_id, payment_intent_id,
                      customer_email, customer_name, shipping_address, items,
                      total_amount, currency, status,
                      provider_status, provider_order_id, metadata,
                      created_at, updated_at
            ",
        )
        .bind(order.id.as_uuid())
        .bind(order.payment_session_id.as_str())
        .bind(order.payment_intent_id.as_ref().map(PaymentIntentId::as_str))
        .bind(order.customer_email.as_str())
        .bind(&order.customer_name)
        .bind(shipping_address)
        .bind(items)
        .bind(order.total_amount)
        .bind(order.currency.code())
        .bind(order.status.to_string())
        .bind(order.provider_status.as_deref())
        .bind(order.provider_order_id.as_deref())
        .bind(&order.metadata)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(
                    "payment session already has an order".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        provider_status: Option<&str>,
        provider_order_id: Option<&str>,
    ) -> Result<Option<Order>, RepositoryError> {
        // The status predicate makes this a compare-and-set: zero rows back
        // means the order was not in `from` anymore, and nothing changed.
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE orders
            SET status = $3,
                provider_status = COALESCE($4, provider_status),
                provider_order_id = COALESCE($5, provider_order_id),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id, payment_session_id, payment_intent_id,
                      customer_email, customer_name, shipping_address, items,
                      total_amount, currency, status,
                      provider_status, provider_order_id, metadata,
                      created_at, updated_at
            ",
        )
        .bind(id.as_uuid())
        .bind(from.to_string())
        .bind(to.to_string())
        .bind(provider_status)
        .bind(provider_order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
