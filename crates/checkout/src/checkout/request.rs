//! Checkout request parsing and field-level validation.
//!
//! Validation collects every problem instead of stopping at the first, so a
//! client gets the full list of broken fields in one 400 response. Field
//! paths in errors use the JSON names the client sent (`items[0].quantity`,
//! `customerEmail`).

use serde::{Deserialize, Serialize};

use saltfern_core::{CurrencyCode, Email, Price, PriceParseError, ProductId, VariantId, parse_amount};

/// Largest quantity accepted for a single cart line.
pub const MAX_QUANTITY: i64 = 100;

/// A single field-level validation failure, serialized into 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Checkout request body as sent by the storefront.
///
/// Fields default when absent so validation can report them as field errors
/// rather than letting serde reject the whole body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// One cart line as claimed by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub claimed_price: String,
}

/// A structurally valid cart line, ready for price validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub claimed: Price,
    pub quantity: u32,
}

/// A structurally valid checkout request.
///
/// Prices in here are still client claims; `PriceValidator` judges them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCart {
    pub lines: Vec<CartLine>,
    pub customer_email: Option<Email>,
}

impl CheckoutRequest {
    /// Validate shape and field constraints.
    ///
    /// # Errors
    ///
    /// Returns every field error found, not just the first.
    pub fn validate(self) -> Result<ValidCart, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.items.is_empty() {
            errors.push(FieldError::new("items", "must contain at least one item"));
        }

        let mut lines = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            if let Some(line) = validate_item(index, item, &mut errors) {
                lines.push(line);
            }
        }

        // A blank email means the field was omitted by a form, not claimed
        let customer_email = match self.customer_email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Email::parse(raw) {
                Ok(email) => Some(email),
                Err(_) => {
                    errors.push(FieldError::new(
                        "customerEmail",
                        "must be a valid email address",
                    ));
                    None
                }
            },
        };

        if errors.is_empty() {
            Ok(ValidCart {
                lines,
                customer_email,
            })
        } else {
            Err(errors)
        }
    }
}

/// Validate one cart line, pushing field errors and returning the parsed
/// line only when every field passed.
fn validate_item(index: usize, item: &CheckoutItem, errors: &mut Vec<FieldError>) -> Option<CartLine> {
    let mut ok = true;

    let product_id = item.product_id.trim();
    if product_id.is_empty() {
        errors.push(FieldError::new(format!("items[{index}].productId"), "is required"));
        ok = false;
    }

    let variant_id = item.variant_id.trim();
    if variant_id.is_empty() {
        errors.push(FieldError::new(format!("items[{index}].variantId"), "is required"));
        ok = false;
    }

    if item.quantity < 1 || item.quantity > MAX_QUANTITY {
        errors.push(FieldError::new(
            format!("items[{index}].quantity"),
            format!("must be between 1 and {MAX_QUANTITY}"),
        ));
        ok = false;
    }

    let claimed = match parse_amount(item.claimed_price.trim()) {
        Ok(amount) => Some(amount),
        Err(err) => {
            let message = match err {
                PriceParseError::Empty => "is required".to_string(),
                PriceParseError::TooLong { max } => {
                    format!("must be at most {max} characters")
                }
                PriceParseError::InvalidFormat => {
                    "must be a positive decimal amount like \"19.99\"".to_string()
                }
            };
            errors.push(FieldError::new(format!("items[{index}].claimedPrice"), message));
            ok = false;
            None
        }
    };

    if !ok {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // Bounds checked above: 1 ..= MAX_QUANTITY
    let quantity = item.quantity as u32;

    Some(CartLine {
        product_id: ProductId::from(product_id),
        variant_id: VariantId::from(variant_id),
        claimed: Price::new(claimed?, CurrencyCode::default()),
        quantity,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(product: &str, variant: &str, quantity: i64, price: &str) -> CheckoutItem {
        CheckoutItem {
            product_id: product.to_string(),
            variant_id: variant.to_string(),
            quantity,
            claimed_price: price.to_string(),
        }
    }

    fn request(items: Vec<CheckoutItem>) -> CheckoutRequest {
        CheckoutRequest {
            items,
            customer_email: None,
        }
    }

    #[test]
    fn test_valid_request() {
        let cart = request(vec![item("mug-1", "v1", 2, "19.99")])
            .validate()
            .unwrap();
        assert_eq!(cart.lines.len(), 1);
        let line = cart.lines.first().unwrap();
        assert_eq!(line.product_id.as_str(), "mug-1");
        assert_eq!(line.claimed.amount, dec!(19.99));
        assert_eq!(line.quantity, 2);
        assert!(cart.customer_email.is_none());
    }

    #[test]
    fn test_empty_items_rejected() {
        let errors = request(vec![]).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().unwrap().field, "items");
    }

    #[test]
    fn test_blank_ids_rejected() {
        let errors = request(vec![item("  ", "", 1, "19.99")])
            .validate()
            .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"items[0].productId"));
        assert!(fields.contains(&"items[0].variantId"));
    }

    #[test]
    fn test_quantity_bounds() {
        for bad in [0, -1, 101, i64::MAX] {
            let errors = request(vec![item("mug-1", "v1", bad, "19.99")])
                .validate()
                .unwrap_err();
            assert_eq!(
                errors.first().unwrap().field,
                "items[0].quantity",
                "quantity {bad}"
            );
        }

        for good in [1, 100] {
            assert!(
                request(vec![item("mug-1", "v1", good, "19.99")])
                    .validate()
                    .is_ok(),
                "quantity {good}"
            );
        }
    }

    #[test]
    fn test_claimed_price_format() {
        for bad in ["", "-19.99", "19.999", "1e3", "19,99", "abc"] {
            let errors = request(vec![item("mug-1", "v1", 1, bad)])
                .validate()
                .unwrap_err();
            assert_eq!(
                errors.first().unwrap().field,
                "items[0].claimedPrice",
                "price {bad:?}"
            );
        }
    }

    #[test]
    fn test_errors_collected_across_items() {
        let errors = request(vec![
            item("", "v1", 1, "19.99"),
            item("mug-1", "v1", 0, "oops"),
        ])
        .validate()
        .unwrap_err();

        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "items[0].productId",
                "items[1].quantity",
                "items[1].claimedPrice",
            ]
        );
    }

    #[test]
    fn test_customer_email_optional_and_validated() {
        let mut req = request(vec![item("mug-1", "v1", 1, "19.99")]);
        req.customer_email = Some("  ".to_string());
        assert!(req.clone().validate().unwrap().customer_email.is_none());

        req.customer_email = Some("not-an-email".to_string());
        let errors = req.clone().validate().unwrap_err();
        assert_eq!(errors.first().unwrap().field, "customerEmail");

        req.customer_email = Some("ada@example.com".to_string());
        let cart = req.validate().unwrap();
        assert_eq!(cart.customer_email.unwrap().as_str(), "ada@example.com");
    }

    #[test]
    fn test_deserializes_camel_case_body() {
        let body = r#"{
            "items": [
                {"productId": "mug-1", "variantId": "v1", "quantity": 2, "claimedPrice": "19.99"}
            ],
            "customerEmail": "ada@example.com"
        }"#;
        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        let first = req.items.first().unwrap();
        assert_eq!(first.product_id, "mug-1");
        assert_eq!(first.claimed_price, "19.99");
        assert_eq!(req.customer_email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_missing_fields_become_field_errors_not_serde_errors() {
        // An items entry with nothing in it still deserializes; validation
        // reports each missing field individually.
        let body = r#"{"items": [{}]}"#;
        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"items[0].productId"));
        assert!(fields.contains(&"items[0].variantId"));
        assert!(fields.contains(&"items[0].quantity"));
        assert!(fields.contains(&"items[0].claimedPrice"));
    }
}
