//! Integration tests for Saltfern.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p saltfern-integration-tests
//! ```
//!
//! These tests drive the real checkout router in process, with wiremock
//! standing in for the Printful catalog and the Stripe gateway and an
//! in-memory store behind the order ledger. No live database or network
//! access is required.
//!
//! # Test Categories
//!
//! - `checkout_flow` - POST /checkout end to end against mock providers
//! - `order_ledger` - Idempotent creation and lifecycle transitions
//! - `legacy_import` - Backfill from legacy JSON documents

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use tower::ServiceExt;
use wiremock::MockServer;

use saltfern_checkout::checkout::SessionBuilder;
use saltfern_checkout::config::{CheckoutConfig, PrintfulConfig, StripeConfig};
use saltfern_checkout::orders::{InMemoryOrderStore, OrderLedger};
use saltfern_checkout::pricing::PriceValidator;
use saltfern_checkout::printful::CatalogClient;
use saltfern_checkout::routes;
use saltfern_checkout::state::AppState;
use saltfern_checkout::stripe::StripeClient;

/// Everything a checkout test needs: the app router, the mock providers
/// behind it, and the ledger it writes to.
pub struct TestApp {
    pub router: Router,
    pub catalog: MockServer,
    pub gateway: MockServer,
    pub ledger: OrderLedger,
}

/// Stand up the checkout app against fresh mock Printful and Stripe servers.
pub async fn spawn_app() -> TestApp {
    let catalog = MockServer::start().await;
    let gateway = MockServer::start().await;

    let config = test_config(&catalog, &gateway);
    let timeout = config.external_timeout();

    let catalog_client = CatalogClient::new(&config.printful, timeout).expect("catalog client");
    let gateway_client = StripeClient::new(&config.stripe, timeout).expect("gateway client");
    let sessions = SessionBuilder::new(
        PriceValidator::new(catalog_client),
        gateway_client,
        &config.base_url,
    );
    let ledger = OrderLedger::new(Arc::new(InMemoryOrderStore::new()));

    let state = AppState::with_services(config, sessions, ledger.clone());
    let router = routes::routes().with_state(state);

    TestApp {
        router,
        catalog,
        gateway,
        ledger,
    }
}

fn test_config(catalog: &MockServer, gateway: &MockServer) -> CheckoutConfig {
    CheckoutConfig {
        database_url: SecretString::from("postgres://localhost/saltfern_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "https://shop.saltfern.test".to_string(),
        printful: PrintfulConfig {
            api_base: catalog.uri(),
            api_token: SecretString::from("pf-test-token"),
            cache_ttl_secs: 300,
        },
        stripe: StripeConfig {
            api_base: gateway.uri(),
            secret_key: SecretString::from("sk_test_integration"),
        },
        external_timeout_secs: 2,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// POST a JSON payload to the app and return status plus parsed body.
pub async fn post_json(
    app: &TestApp,
    path: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_raw(app, path, &body.to_string()).await
}

/// POST a raw body with a JSON content type (for malformed-payload tests).
pub async fn post_raw(app: &TestApp, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json response body")
    };
    (status, json)
}

/// GET a path and return status plus raw body text.
pub async fn get_text(app: &TestApp, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Canned Printful product detail for the `mug-1` store product.
///
/// Two sync variants: `v1` (11oz) at 19.99 and `v2` (15oz) at 24.99.
#[must_use]
pub fn mug_product_body() -> serde_json::Value {
    serde_json::json!({
        "code": 200,
        "result": {
            "sync_product": {
                "id": 301,
                "external_id": "mug-1",
                "name": "Ceramic Mug"
            },
            "sync_variants": [
                {
                    "id": 4011,
                    "external_id": "v1",
                    "name": "Ceramic Mug / 11oz",
                    "retail_price": "19.99",
                    "currency": "USD"
                },
                {
                    "id": 4012,
                    "external_id": "v2",
                    "name": "Ceramic Mug / 15oz",
                    "retail_price": "24.99",
                    "currency": "USD"
                }
            ]
        }
    })
}

/// Canned Stripe checkout session creation response.
#[must_use]
pub fn gateway_session_body(session_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": session_id,
        "object": "checkout.session",
        "url": format!("https://checkout.stripe.com/c/pay/{session_id}")
    })
}
