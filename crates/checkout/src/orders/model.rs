//! Order domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use saltfern_core::{CurrencyCode, Email, OrderId, OrderStatus, PaymentIntentId, PaymentSessionId};

use crate::pricing::ValidatedLineItem;

/// Shipping destination captured at payment time.
///
/// Serializes in camelCase; stored as JSONB on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
}

/// A customer order created from a completed checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    /// Natural key: the gateway session that paid for this order.
    pub payment_session_id: PaymentSessionId,
    pub payment_intent_id: Option<PaymentIntentId>,
    pub customer_email: Email,
    pub customer_name: String,
    pub shipping_address: ShippingAddress,
    /// Validated line items the customer paid for.
    pub items: Vec<ValidatedLineItem>,
    /// Items plus shipping.
    pub total_amount: Decimal,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    /// Raw status string last reported by the fulfillment provider.
    pub provider_status: Option<String>,
    /// Order id assigned by the fulfillment provider.
    pub provider_order_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs for creating a new order.
///
/// Carries no total: the ledger recomputes it from items and shipping, so a
/// caller can never store a total that disagrees with the line items.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub payment_session_id: PaymentSessionId,
    pub payment_intent_id: Option<PaymentIntentId>,
    pub customer_email: Email,
    pub customer_name: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<ValidatedLineItem>,
    /// Shipping charge the customer chose on the gateway payment page.
    pub shipping_amount: Decimal,
    pub currency: CurrencyCode,
    pub metadata: serde_json::Value,
}

impl OrderDraft {
    /// Sum of line totals plus shipping.
    #[must_use]
    pub fn computed_total(&self) -> Decimal {
        self.items
            .iter()
            .map(ValidatedLineItem::line_total)
            .sum::<Decimal>()
            + self.shipping_amount
    }
}
