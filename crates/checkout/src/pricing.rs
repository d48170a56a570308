//! Server-side price validation.
//!
//! Client-claimed prices are display hints, never inputs to a charge. Every
//! cart line is checked against the catalog before a checkout session is
//! built, and the amount forwarded to the payment gateway always comes from
//! the catalog side of that comparison.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use saltfern_core::{CurrencyCode, Price, ProductId, VariantId};

use crate::printful::{CatalogClient, CatalogError};

/// Accepted absolute gap between a claimed and an authoritative price.
///
/// Request validation caps claimed prices at two decimal places, so any real
/// price change differs by at least a cent. The tolerance only forgives
/// sub-cent representation noise from clients, and a gap of exactly the
/// tolerance is already a rejection.
pub const PRICE_TOLERANCE: Decimal = dec!(0.005);

/// Outcome of comparing a claimed price against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceCheck {
    /// Whether the claimed price is accepted.
    pub valid: bool,
    /// The authoritative catalog price.
    pub server_price: Price,
    /// Claimed amount minus server amount; negative when the client
    /// undercuts.
    pub difference: Decimal,
}

/// A rejected price claim, kept whole for fraud monitoring.
#[derive(Debug, Clone)]
pub struct PriceMismatch {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub claimed: Price,
    pub server: Price,
}

impl PriceMismatch {
    /// Claimed amount minus server amount.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.claimed.amount - self.server.amount
    }
}

impl std::fmt::Display for PriceMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "claimed {} vs server {} for {}/{}",
            self.claimed, self.server, self.product_id, self.variant_id
        )
    }
}

/// Errors produced while validating cart prices.
#[derive(Debug, Error)]
pub enum PriceError {
    /// Claimed price disagreed with the catalog beyond tolerance.
    #[error("Price mismatch: {0}")]
    Mismatch(PriceMismatch),

    /// Cart references a product or variant the catalog does not know.
    #[error("Unknown item: {product_id}/{variant_id}")]
    UnknownItem {
        product_id: ProductId,
        variant_id: VariantId,
    },

    /// The catalog could not answer; the request fails closed.
    #[error("Price lookup failed: {0}")]
    Lookup(CatalogError),
}

/// A cart line whose price has been verified against the catalog.
///
/// By convention only [`PriceValidator::validate_item`] constructs these, so
/// downstream code (session builder, order ledger) never handles a
/// client-claimed price. Serializes in camelCase for session metadata and
/// stored order items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedLineItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// Catalog display name, shown on the gateway's payment page.
    pub name: String,
    /// Authoritative per-unit amount.
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_amount: Decimal,
    pub currency: CurrencyCode,
    pub quantity: u32,
}

impl ValidatedLineItem {
    /// Line total (unit amount times quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_amount * Decimal::from(self.quantity)
    }
}

/// Validates claimed cart prices against the authoritative catalog.
#[derive(Clone)]
pub struct PriceValidator {
    catalog: CatalogClient,
}

impl PriceValidator {
    #[must_use]
    pub const fn new(catalog: CatalogClient) -> Self {
        Self { catalog }
    }

    /// Compare a claimed price against the catalog.
    ///
    /// A disagreement is not an error here; the result reports validity,
    /// the server price, and the signed difference.
    ///
    /// # Errors
    ///
    /// Returns the underlying catalog error when no authoritative price can
    /// be resolved. Lookup failures never fall back to the claimed price.
    pub async fn check(
        &self,
        claimed: Price,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Result<PriceCheck, CatalogError> {
        let server_price = self
            .catalog
            .authoritative_price(product_id, variant_id)
            .await?;
        let difference = claimed.amount - server_price.amount;
        let valid =
            claimed.currency == server_price.currency && difference.abs() < PRICE_TOLERANCE;
        Ok(PriceCheck {
            valid,
            server_price,
            difference,
        })
    }

    /// Validate one cart line and stamp it with the authoritative price and
    /// catalog display name.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Mismatch` when the claim disagrees with the
    /// catalog, `PriceError::UnknownItem` for ids the catalog does not know,
    /// and `PriceError::Lookup` when the catalog cannot answer at all.
    pub async fn validate_item(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
        claimed: Price,
        quantity: u32,
    ) -> Result<ValidatedLineItem, PriceError> {
        let listing = match self
            .catalog
            .authoritative_listing(product_id, variant_id)
            .await
        {
            Ok(listing) => listing,
            Err(CatalogError::NotFound {
                product_id,
                variant_id,
            }) => {
                return Err(PriceError::UnknownItem {
                    product_id,
                    variant_id,
                });
            }
            Err(err) => return Err(PriceError::Lookup(err)),
        };

        let difference = claimed.amount - listing.price.amount;
        if claimed.currency != listing.price.currency || difference.abs() >= PRICE_TOLERANCE {
            return Err(PriceError::Mismatch(PriceMismatch {
                product_id: product_id.clone(),
                variant_id: variant_id.clone(),
                claimed,
                server: listing.price,
            }));
        }

        Ok(ValidatedLineItem {
            product_id: listing.product_id,
            variant_id: listing.variant_id,
            name: listing.name,
            unit_amount: listing.price.amount,
            currency: listing.price.currency,
            quantity,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PrintfulConfig;
    use secrecy::SecretString;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRODUCT_BODY: &str = r#"{
        "result": {
            "sync_product": { "id": 301, "external_id": "mug-1", "name": "Ceramic Mug" },
            "sync_variants": [
                {
                    "id": 4011,
                    "external_id": "v1",
                    "name": "Ceramic Mug / White / 11 oz",
                    "retail_price": "19.99",
                    "currency": "USD"
                }
            ]
        }
    }"#;

    async fn validator_with_catalog(status: u16, body: &str) -> (MockServer, PriceValidator) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let config = PrintfulConfig {
            api_base: server.uri(),
            api_token: SecretString::from("pf_8UzkQ3VqWm2yRt7c"),
            cache_ttl_secs: 300,
        };
        let catalog = CatalogClient::new(&config, Duration::from_secs(2)).unwrap();
        (server, PriceValidator::new(catalog))
    }

    fn usd(amount: Decimal) -> Price {
        Price::new(amount, CurrencyCode::USD)
    }

    #[tokio::test]
    async fn test_check_exact_claim_is_valid() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let check = validator
            .check(
                usd(dec!(19.99)),
                &ProductId::from("mug-1"),
                &VariantId::from("v1"),
            )
            .await
            .unwrap();
        assert!(check.valid);
        assert_eq!(check.server_price.amount, dec!(19.99));
        assert_eq!(check.difference, dec!(0.00));
    }

    #[tokio::test]
    async fn test_check_undercut_claim_is_invalid() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let check = validator
            .check(
                usd(dec!(9.99)),
                &ProductId::from("mug-1"),
                &VariantId::from("v1"),
            )
            .await
            .unwrap();
        assert!(!check.valid);
        assert_eq!(check.server_price.amount, dec!(19.99));
        assert_eq!(check.difference, dec!(-10.00));
    }

    #[tokio::test]
    async fn test_check_currency_mismatch_is_invalid() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let check = validator
            .check(
                Price::new(dec!(19.99), CurrencyCode::EUR),
                &ProductId::from("mug-1"),
                &VariantId::from("v1"),
            )
            .await
            .unwrap();
        assert!(!check.valid);
    }

    #[tokio::test]
    async fn test_check_tolerance_boundary() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let product = ProductId::from("mug-1");
        let variant = VariantId::from("v1");

        // Sub-tolerance noise is forgiven
        let check = validator
            .check(usd(dec!(19.9949)), &product, &variant)
            .await
            .unwrap();
        assert!(check.valid);

        // A gap of exactly the tolerance is rejected
        let check = validator
            .check(usd(dec!(19.985)), &product, &variant)
            .await
            .unwrap();
        assert!(!check.valid);
    }

    #[tokio::test]
    async fn test_validate_item_stamps_server_price() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let item = validator
            .validate_item(
                &ProductId::from("mug-1"),
                &VariantId::from("v1"),
                usd(dec!(19.99)),
                2,
            )
            .await
            .unwrap();

        assert_eq!(item.unit_amount, dec!(19.99));
        assert_eq!(item.currency, CurrencyCode::USD);
        assert_eq!(item.name, "Ceramic Mug / White / 11 oz");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.line_total(), dec!(39.98));
    }

    #[tokio::test]
    async fn test_validate_item_rejects_mismatch() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let err = validator
            .validate_item(
                &ProductId::from("mug-1"),
                &VariantId::from("v1"),
                usd(dec!(9.99)),
                1,
            )
            .await
            .unwrap_err();

        match err {
            PriceError::Mismatch(mismatch) => {
                assert_eq!(mismatch.claimed.amount, dec!(9.99));
                assert_eq!(mismatch.server.amount, dec!(19.99));
                assert_eq!(mismatch.difference(), dec!(-10.00));
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_item_unknown_variant() {
        let (_server, validator) = validator_with_catalog(200, PRODUCT_BODY).await;
        let err = validator
            .validate_item(
                &ProductId::from("mug-1"),
                &VariantId::from("v9"),
                usd(dec!(19.99)),
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PriceError::UnknownItem { .. }));
    }

    #[tokio::test]
    async fn test_validate_item_lookup_failure_fails_closed() {
        let (_server, validator) = validator_with_catalog(500, "oops").await;
        let err = validator
            .validate_item(
                &ProductId::from("mug-1"),
                &VariantId::from("v1"),
                usd(dec!(19.99)),
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PriceError::Lookup(_)));
    }

    #[test]
    fn test_validated_line_item_serializes_camel_case() {
        let item = ValidatedLineItem {
            product_id: ProductId::from("mug-1"),
            variant_id: VariantId::from("v1"),
            name: "Ceramic Mug / White / 11 oz".to_string(),
            unit_amount: dec!(19.99),
            currency: CurrencyCode::USD,
            quantity: 2,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productId"], "mug-1");
        assert_eq!(json["variantId"], "v1");
        assert_eq!(json["unitAmount"], "19.99");
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["quantity"], 2);
    }
}
