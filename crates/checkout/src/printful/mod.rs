//! Printful store API client.
//!
//! The catalog is the single source of truth for prices: whatever a browser
//! claims an item costs, the amount sent to the payment gateway comes from
//! here. Variant listings are cached using `moka` with a bounded TTL so a
//! price change on Printful propagates within one cache window.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, instrument};

use saltfern_core::{CurrencyCode, Price, ProductId, VariantId, parse_amount};

use crate::config::PrintfulConfig;
use types::{ApiEnvelope, SyncProductDetail, SyncVariant};

/// Errors that can occur when resolving catalog prices.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (connection error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Product or variant does not exist in the store catalog.
    #[error("Variant not found: {product_id}/{variant_id}")]
    NotFound {
        product_id: ProductId,
        variant_id: VariantId,
    },

    /// Failed to parse a response or a price inside it.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An authoritative catalog listing for a single sellable variant.
///
/// `variant_id` is the merchant-assigned external id when Printful has one,
/// otherwise the numeric sync variant id rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantListing {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// Display name shown on the gateway's payment page.
    pub name: String,
    /// Current retail price from the catalog.
    pub price: Price,
}

/// Client for the Printful store API.
///
/// Resolves variant prices with a read-through cache: a product fetch caches
/// every variant in the payload, so a multi-line cart for one product costs a
/// single upstream call.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    api_base: String,
    cache: Cache<String, VariantListing>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PrintfulConfig, timeout: Duration) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| CatalogError::Parse(format!("Invalid API token format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    /// Get the authoritative price for a variant.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product or variant does not
    /// exist, and other variants for upstream or parse failures.
    pub async fn authoritative_price(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Result<Price, CatalogError> {
        Ok(self
            .authoritative_listing(product_id, variant_id)
            .await?
            .price)
    }

    /// Get the full catalog listing (name and price) for a variant.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product or variant does not
    /// exist, and other variants for upstream or parse failures.
    #[instrument(skip(self), fields(product_id = %product_id, variant_id = %variant_id))]
    pub async fn authoritative_listing(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Result<VariantListing, CatalogError> {
        let cache_key = price_cache_key(product_id, variant_id.as_str());

        // Check cache
        if let Some(listing) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for variant price");
            return Ok(listing);
        }

        let detail = self.fetch_product(product_id, variant_id).await?;

        // Cache every variant that parses cleanly; a later cart line for a
        // sibling variant then resolves without another upstream call. Each
        // listing is keyed under both the numeric sync id and the external
        // id so either form of cart variant id hits.
        for variant in &detail.sync_variants {
            if let Ok(listing) = parse_listing(product_id, variant) {
                self.inner
                    .cache
                    .insert(
                        price_cache_key(product_id, &variant.id.to_string()),
                        listing.clone(),
                    )
                    .await;
                if !variant.external_id.is_empty() {
                    self.inner
                        .cache
                        .insert(
                            price_cache_key(product_id, &variant.external_id),
                            listing,
                        )
                        .await;
                }
            }
        }

        let Some(variant) = detail
            .sync_variants
            .iter()
            .find(|v| variant_matches(v, variant_id))
        else {
            return Err(CatalogError::NotFound {
                product_id: product_id.clone(),
                variant_id: variant_id.clone(),
            });
        };

        parse_listing(product_id, variant)
    }

    /// Fetch a sync product with all its variants.
    async fn fetch_product(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Result<SyncProductDetail, CatalogError> {
        let url = format!(
            "{}{}",
            self.inner.api_base,
            product_path(product_id.as_str())
        );

        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        // Printful answers 404 for unknown product ids
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                product_id: product_id.clone(),
                variant_id: variant_id.clone(),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %message.chars().take(500).collect::<String>(),
                "Printful API returned non-success status"
            );
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<SyncProductDetail> = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(envelope.result)
    }
}

/// Path for a sync product lookup.
///
/// Printful addresses store products either by numeric sync id or, with an
/// `@` prefix, by merchant-assigned external id.
fn product_path(product_id: &str) -> String {
    if product_id.bytes().all(|b| b.is_ascii_digit()) {
        format!("/store/products/{product_id}")
    } else {
        format!("/store/products/@{product_id}")
    }
}

fn price_cache_key(product_id: &ProductId, variant_key: &str) -> String {
    format!("price:{product_id}:{variant_key}")
}

fn variant_matches(variant: &SyncVariant, variant_id: &VariantId) -> bool {
    variant.id.to_string() == variant_id.as_str()
        || (!variant.external_id.is_empty() && variant.external_id == variant_id.as_str())
}

/// Build a listing from a wire variant, parsing its price and currency.
fn parse_listing(
    product_id: &ProductId,
    variant: &SyncVariant,
) -> Result<VariantListing, CatalogError> {
    let amount = parse_amount(&variant.retail_price).map_err(|e| {
        CatalogError::Parse(format!(
            "variant {} has invalid retail_price {:?}: {e}",
            variant.id, variant.retail_price
        ))
    })?;
    let currency = variant
        .currency
        .parse::<CurrencyCode>()
        .map_err(|e| CatalogError::Parse(format!("variant {}: {e}", variant.id)))?;

    let variant_id = if variant.external_id.is_empty() {
        VariantId::from(variant.id.to_string())
    } else {
        VariantId::from(variant.external_id.as_str())
    };

    Ok(VariantListing {
        product_id: product_id.clone(),
        variant_id,
        name: variant.name.clone(),
        price: Price::new(amount, currency),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_TOKEN: &str = "pf_8UzkQ3VqWm2yRt7c";

    const PRODUCT_BODY: &str = r#"{
        "code": 200,
        "result": {
            "sync_product": { "id": 301, "external_id": "mug-1", "name": "Ceramic Mug" },
            "sync_variants": [
                {
                    "id": 4011,
                    "external_id": "v1",
                    "name": "Ceramic Mug / White / 11 oz",
                    "retail_price": "19.99",
                    "currency": "USD"
                },
                {
                    "id": 4012,
                    "external_id": "v2",
                    "name": "Ceramic Mug / Black / 11 oz",
                    "retail_price": "21.99",
                    "currency": "USD"
                }
            ]
        }
    }"#;

    fn test_config(api_base: String) -> PrintfulConfig {
        PrintfulConfig {
            api_base,
            api_token: SecretString::from(TEST_TOKEN),
            cache_ttl_secs: 300,
        }
    }

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&test_config(server.uri()), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_product_path_numeric_vs_external() {
        assert_eq!(product_path("301"), "/store/products/301");
        assert_eq!(product_path("mug-1"), "/store/products/@mug-1");
    }

    #[tokio::test]
    async fn test_lookup_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .and(header("Authorization", format!("Bearer {TEST_TOKEN}")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PRODUCT_BODY, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let price = client
            .authoritative_price(&ProductId::from("mug-1"), &VariantId::from("v1"))
            .await
            .unwrap();
        assert_eq!(price.amount, dec!(19.99));
        assert_eq!(price.currency, CurrencyCode::USD);
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let server = MockServer::start().await;
        // expect(1) fails the test if the client goes upstream twice
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PRODUCT_BODY, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let product = ProductId::from("mug-1");
        let first = client
            .authoritative_listing(&product, &VariantId::from("v1"))
            .await
            .unwrap();
        let second = client
            .authoritative_listing(&product, &VariantId::from("v1"))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sibling_variant_cached_by_first_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PRODUCT_BODY, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let product = ProductId::from("mug-1");
        client
            .authoritative_listing(&product, &VariantId::from("v1"))
            .await
            .unwrap();

        // v2 and the numeric form of v1 both resolve without a second call
        let sibling = client
            .authoritative_price(&product, &VariantId::from("v2"))
            .await
            .unwrap();
        assert_eq!(sibling.amount, dec!(21.99));
        let numeric = client
            .authoritative_price(&product, &VariantId::from("4011"))
            .await
            .unwrap();
        assert_eq!(numeric.amount, dec!(19.99));
    }

    #[tokio::test]
    async fn test_unknown_variant_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PRODUCT_BODY, "application/json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .authoritative_listing(&ProductId::from("mug-1"), &VariantId::from("v9"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_raw(
                r#"{"code": 404, "result": "Product not found"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .authoritative_listing(&ProductId::from("ghost"), &VariantId::from("v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .authoritative_listing(&ProductId::from("mug-1"), &VariantId::from("v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .authoritative_listing(&ProductId::from("mug-1"), &VariantId::from("v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unparseable_price_is_parse_error() {
        let server = MockServer::start().await;
        let body = r#"{
            "result": {
                "sync_product": { "id": 301, "external_id": "mug-1", "name": "Ceramic Mug" },
                "sync_variants": [
                    {
                        "id": 4011,
                        "external_id": "v1",
                        "name": "Ceramic Mug / White / 11 oz",
                        "retail_price": "19.999",
                        "currency": "USD"
                    }
                ]
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/store/products/@mug-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .authoritative_listing(&ProductId::from("mug-1"), &VariantId::from("v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
