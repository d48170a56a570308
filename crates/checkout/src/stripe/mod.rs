//! Stripe Checkout Session client.
//!
//! Talks to Stripe's REST API directly with form-encoded bodies, which is
//! all the checkout flow needs. Amounts are converted to minor units
//! (cents) at the wire boundary; everything upstream stays in `Decimal`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use saltfern_core::{PaymentSessionId, Price};

use crate::checkout::shipping::ShippingOption;
use crate::config::StripeConfig;
use crate::pricing::ValidatedLineItem;

/// Errors that can occur when creating checkout sessions.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed (connection error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// An amount could not be expressed in minor units.
    #[error("Unrepresentable amount: {0}")]
    UnrepresentableAmount(String),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A created checkout session, reduced to what the storefront needs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: PaymentSessionId,
    /// Hosted payment page the browser is redirected to.
    pub url: String,
}

/// Inputs for a checkout session create call.
#[derive(Debug)]
pub struct SessionParams<'a> {
    pub line_items: &'a [ValidatedLineItem],
    pub shipping_options: &'a [ShippingOption],
    pub allowed_countries: &'a [&'a str],
    pub customer_email: Option<&'a str>,
    /// Session metadata key/value pairs, stored verbatim by the gateway.
    pub metadata: &'a [(String, String)],
    pub success_url: String,
    pub cancel_url: String,
}

/// Client for Stripe's Checkout Session API.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns error if an amount cannot be expressed in minor units, the
    /// request fails, or the response cannot be parsed.
    #[instrument(skip_all, fields(line_items = params.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        params: &SessionParams<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        let form = encode_form(params)?;
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let response = self
            .client
            .post(&url)
            // Stripe authenticates with the secret key as basic auth username
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %message.chars().take(500).collect::<String>(),
                "Stripe API returned non-success status"
            );
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

/// Flatten session params into Stripe's bracketed form encoding.
fn encode_form(params: &SessionParams<'_>) -> Result<Vec<(String, String)>, StripeError> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
    ];

    if let Some(email) = params.customer_email {
        form.push(("customer_email".to_string(), email.to_string()));
    }

    for (i, item) in params.line_items.iter().enumerate() {
        let unit_amount = Price::new(item.unit_amount, item.currency)
            .minor_units()
            .ok_or_else(|| {
                StripeError::UnrepresentableAmount(format!(
                    "{} for {}/{}",
                    item.unit_amount, item.product_id, item.variant_id
                ))
            })?;

        form.push((
            format!("line_items[{i}][price_data][currency]"),
            item.currency.gateway_code().to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            unit_amount.to_string(),
        ));
        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    for (i, country) in params.allowed_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            (*country).to_string(),
        ));
    }

    for (i, option) in params.shipping_options.iter().enumerate() {
        let amount = Price::new(option.amount, option.currency)
            .minor_units()
            .ok_or_else(|| {
                StripeError::UnrepresentableAmount(format!(
                    "{} for shipping option {}",
                    option.amount, option.display_name
                ))
            })?;
        let prefix = format!("shipping_options[{i}][shipping_rate_data]");

        form.push((format!("{prefix}[type]"), "fixed_amount".to_string()));
        form.push((
            format!("{prefix}[display_name]"),
            option.display_name.to_string(),
        ));
        form.push((format!("{prefix}[fixed_amount][amount]"), amount.to_string()));
        form.push((
            format!("{prefix}[fixed_amount][currency]"),
            option.currency.gateway_code().to_string(),
        ));
        form.push((
            format!("{prefix}[delivery_estimate][minimum][unit]"),
            "business_day".to_string(),
        ));
        form.push((
            format!("{prefix}[delivery_estimate][minimum][value]"),
            option.min_business_days.to_string(),
        ));
        form.push((
            format!("{prefix}[delivery_estimate][maximum][unit]"),
            "business_day".to_string(),
        ));
        form.push((
            format!("{prefix}[delivery_estimate][maximum][value]"),
            option.max_business_days.to_string(),
        ));
    }

    for (key, value) in params.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    Ok(form)
}
