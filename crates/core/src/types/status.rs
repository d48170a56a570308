//! Order lifecycle status.
//!
//! The lifecycle is deliberately monotonic: an order moves forward through
//! payment and fulfillment, may divert to `refunded` once money has been
//! taken, or to `failed` while payment is still pending. There are no
//! backward edges and no self-loops; a transition that is not listed in
//! [`OrderStatus::can_transition_to`] must be rejected without touching the
//! stored row.

use serde::{Deserialize, Serialize};

/// Where an order is in its payment/fulfillment lifecycle.
///
/// ```text
/// pending_payment -> paid -> fulfillment_requested -> fulfilled
///        |            \______________|____________________/
///        v                           v
///      failed                    refunded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checkout session created, payment not yet confirmed.
    #[default]
    PendingPayment,
    /// Payment confirmed by the gateway.
    Paid,
    /// Order submitted to the fulfillment provider.
    FulfillmentRequested,
    /// Fulfillment provider reports the order shipped/complete.
    Fulfilled,
    /// Payment never completed.
    Failed,
    /// Payment returned after it was taken.
    Refunded,
}

impl OrderStatus {
    /// Every status, in lifecycle order. Handy for exhaustive checks.
    pub const ALL: [Self; 6] = [
        Self::PendingPayment,
        Self::Paid,
        Self::FulfillmentRequested,
        Self::Fulfilled,
        Self::Failed,
        Self::Refunded,
    ];

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Paid | Self::Failed)
                | (Self::Paid, Self::FulfillmentRequested | Self::Refunded)
                | (Self::FulfillmentRequested, Self::Fulfilled | Self::Refunded)
                | (Self::Fulfilled, Self::Refunded)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::FulfillmentRequested => "fulfillment_requested",
            Self::Fulfilled => "fulfilled",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "fulfillment_requested" => Ok(Self::FulfillmentRequested),
            "fulfilled" => Ok(Self::Fulfilled),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
