//! All-or-nothing checkout session construction.
//!
//! Every cart line must pass price validation before the gateway is
//! contacted; the first failure aborts the whole request. The amounts
//! forwarded to the gateway are the catalog's, never the client's, and the
//! validated cart is serialized into session metadata so order creation
//! after payment works from verified data.

use serde::Serialize;

use saltfern_core::PaymentSessionId;

use crate::checkout::request::ValidCart;
use crate::checkout::shipping::{ALLOWED_COUNTRIES, SHIPPING_OPTIONS};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::pricing::PriceValidator;
use crate::stripe::{SessionParams, StripeClient};

/// Session metadata key holding the validated cart JSON.
pub const VALIDATED_CART_METADATA_KEY: &str = "validated_cart";

/// Successful checkout response: where to send the browser.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRedirect {
    pub session_id: PaymentSessionId,
    pub redirect_url: String,
}

/// Builds hosted checkout sessions from validated carts.
#[derive(Clone)]
pub struct SessionBuilder {
    validator: PriceValidator,
    gateway: StripeClient,
    base_url: String,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(validator: PriceValidator, gateway: StripeClient, base_url: &str) -> Self {
        Self {
            validator,
            gateway,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Validate every cart line and create a gateway session for it.
    ///
    /// # Errors
    ///
    /// Returns a price error if any line fails validation (the gateway is
    /// never called in that case) and a gateway error if session creation
    /// fails after a fully validated cart.
    pub async fn build(&self, cart: ValidCart) -> Result<CheckoutRedirect> {
        let mut validated = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let item = self
                .validator
                .validate_item(&line.product_id, &line.variant_id, line.claimed, line.quantity)
                .await?;
            validated.push(item);
        }

        add_breadcrumb(
            "checkout",
            "Validated cart",
            Some(&[("items", &validated.len().to_string())]),
        );

        let cart_json = serde_json::to_string(&validated)
            .map_err(|e| AppError::Internal(format!("Failed to serialize validated cart: {e}")))?;
        let metadata = [(VALIDATED_CART_METADATA_KEY.to_string(), cart_json)];

        let params = SessionParams {
            line_items: &validated,
            shipping_options: SHIPPING_OPTIONS,
            allowed_countries: ALLOWED_COUNTRIES,
            customer_email: cart.customer_email.as_ref().map(saltfern_core::Email::as_str),
            metadata: &metadata,
            // {CHECKOUT_SESSION_ID} is substituted by the gateway on redirect
            success_url: format!(
                "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.base_url
            ),
            cancel_url: format!("{}/checkout/cancel", self.base_url),
        };

        let session = self.gateway.create_checkout_session(&params).await?;

        tracing::info!(
            session_id = %session.id,
            items = validated.len(),
            "Created checkout session"
        );

        Ok(CheckoutRedirect {
            session_id: session.id,
            redirect_url: session.url,
        })
    }
}
