//! Order ledger: idempotent creation and lifecycle transitions.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use saltfern_core::{OrderId, OrderStatus, PaymentSessionId};

use crate::db::RepositoryError;
use crate::orders::model::{Order, OrderDraft};
use crate::orders::store::OrderStore;

/// Errors from ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("illegal status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("order store error: {0}")]
    Store(#[from] RepositoryError),
}

/// Result of an idempotent create.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub order: Order,
    /// False when an order for the payment session already existed.
    pub created: bool,
}

/// Order bookkeeping over an [`OrderStore`].
///
/// Creation is idempotent on payment session id, and status changes only
/// move along legal lifecycle edges. Anything else is rejected without
/// touching the stored row.
#[derive(Clone)]
pub struct OrderLedger {
    store: Arc<dyn OrderStore>,
}

impl fmt::Debug for OrderLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderLedger").finish_non_exhaustive()
    }
}

impl OrderLedger {
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Create an order for a payment session, or return the existing one.
    ///
    /// Safe to call concurrently (webhook retries, double deliveries): at
    /// most one row per payment session ever exists, and losers of the
    /// insert race receive the winner's row with `created: false`. The
    /// stored total is recomputed from the draft's items and shipping.
    #[instrument(skip(self, draft), fields(payment_session_id = %draft.payment_session_id))]
    pub async fn create_if_absent(&self, draft: OrderDraft) -> Result<CreateOutcome, LedgerError> {
        if let Some(existing) = self
            .store
            .get_by_payment_session_id(&draft.payment_session_id)
            .await?
        {
            debug!("Order already exists for payment session");
            return Ok(CreateOutcome {
                order: existing,
                created: false,
            });
        }

        let total_amount = draft.computed_total();
        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            payment_session_id: draft.payment_session_id,
            payment_intent_id: draft.payment_intent_id,
            customer_email: draft.customer_email,
            customer_name: draft.customer_name,
            shipping_address: draft.shipping_address,
            items: draft.items,
            total_amount,
            currency: draft.currency,
            status: OrderStatus::PendingPayment,
            provider_status: None,
            provider_order_id: None,
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
        };

        self.insert_or_existing(order).await
    }

    /// Insert a pre-built order unless its payment session already has one.
    ///
    /// Used by the legacy import: the order's id, status, total, and
    /// timestamps are stored verbatim.
    #[instrument(skip(self, order), fields(payment_session_id = %order.payment_session_id))]
    pub async fn backfill_if_absent(&self, order: Order) -> Result<CreateOutcome, LedgerError> {
        if let Some(existing) = self
            .store
            .get_by_payment_session_id(&order.payment_session_id)
            .await?
        {
            debug!("Order already exists for payment session");
            return Ok(CreateOutcome {
                order: existing,
                created: false,
            });
        }

        self.insert_or_existing(order).await
    }

    async fn insert_or_existing(&self, order: Order) -> Result<CreateOutcome, LedgerError> {
        let session_id = order.payment_session_id.clone();
        match self.store.insert(order).await {
            Ok(order) => {
                info!(order_id = %order.id, "Created order");
                Ok(CreateOutcome {
                    order,
                    created: true,
                })
            }
            Err(RepositoryError::Conflict(_)) => {
                // Lost a concurrent insert race; hand back the winner's row
                let existing = self
                    .store
                    .get_by_payment_session_id(&session_id)
                    .await?
                    .ok_or(LedgerError::Store(RepositoryError::NotFound))?;
                Ok(CreateOutcome {
                    order: existing,
                    created: false,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Advance an order to `next`, recording provider fields when given.
    ///
    /// Transitions not listed in [`OrderStatus::can_transition_to`] return
    /// [`LedgerError::IllegalTransition`] and leave the stored row untouched.
    #[instrument(skip(self), fields(order_id = %id, next_status = %next))]
    pub async fn update_fulfillment_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        provider_status: Option<&str>,
        provider_order_id: Option<&str>,
    ) -> Result<Order, LedgerError> {
        // The lifecycle has no cycles, so every compare-and-set miss means
        // the row advanced and this loop terminates.
        loop {
            let current = self
                .store
                .get_by_id(id)
                .await?
                .ok_or(LedgerError::NotFound(id))?;

            if !current.status.can_transition_to(next) {
                warn!(current_status = %current.status, "Rejected illegal status transition");
                return Err(LedgerError::IllegalTransition {
                    from: current.status,
                    to: next,
                });
            }

            if let Some(order) = self
                .store
                .transition_status(id, current.status, next, provider_status, provider_order_id)
                .await?
            {
                info!(previous_status = %current.status, "Updated order status");
                return Ok(order);
            }
        }
    }

    /// Look up an order by its payment session id.
    pub async fn get_by_payment_session_id(
        &self,
        payment_session_id: &PaymentSessionId,
    ) -> Result<Option<Order>, LedgerError> {
        Ok(self
            .store
            .get_by_payment_session_id(payment_session_id)
            .await?)
    }

    /// Look up an order by its internal id.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, LedgerError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Total number of stored orders.
    pub async fn count(&self) -> Result<i64, LedgerError> {
        Ok(self.store.count().await?)
    }

    /// Check that the backing store is reachable.
    pub async fn ping(&self) -> Result<(), LedgerError> {
        Ok(self.store.ping().await?)
    }
}
