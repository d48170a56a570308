//! Integration tests for the order ledger.
//!
//! Covers the path from a completed payment to a stored order: duplicate
//! webhook deliveries must never produce a second row, and fulfillment
//! status changes only move along legal lifecycle edges.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use saltfern_checkout::orders::{
    InMemoryOrderStore, LedgerError, OrderDraft, OrderLedger, ShippingAddress,
};
use saltfern_checkout::pricing::ValidatedLineItem;
use saltfern_core::{
    CurrencyCode, Email, OrderStatus, PaymentIntentId, PaymentSessionId, ProductId, VariantId,
};
use saltfern_integration_tests::{gateway_session_body, mug_product_body, post_json, spawn_app};

// =============================================================================
// Helpers
// =============================================================================

fn ledger() -> OrderLedger {
    OrderLedger::new(Arc::new(InMemoryOrderStore::new()))
}

fn address() -> ShippingAddress {
    ShippingAddress {
        line1: "42 Harbor Way".to_string(),
        line2: Some("Unit 3".to_string()),
        city: "Seattle".to_string(),
        state: Some("WA".to_string()),
        postal_code: "98101".to_string(),
        country: "US".to_string(),
    }
}

fn draft(session: &str) -> OrderDraft {
    OrderDraft {
        payment_session_id: PaymentSessionId::from(session),
        payment_intent_id: Some(PaymentIntentId::from("pi_test_9")),
        customer_email: Email::parse("grace@example.com").expect("email"),
        customer_name: "Grace Hopper".to_string(),
        shipping_address: address(),
        items: vec![ValidatedLineItem {
            product_id: ProductId::from("tee-2"),
            variant_id: VariantId::from("v5"),
            name: "Logo Tee / M".to_string(),
            unit_amount: dec!(24.99),
            currency: CurrencyCode::USD,
            quantity: 1,
        }],
        shipping_amount: dec!(9.99),
        currency: CurrencyCode::USD,
        metadata: serde_json::json!({}),
    }
}

// =============================================================================
// Checkout to Order
// =============================================================================

/// End to end: a checkout stores the validated cart in gateway session
/// metadata, and order creation works from that metadata alone. Nothing the
/// client claimed survives into the stored order.
#[tokio::test]
async fn test_validated_cart_metadata_flows_into_order_creation() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/store/products/@mug-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mug_product_body()))
        .mount(&app.catalog)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_session_body("cs_test_123")))
        .mount(&app.gateway)
        .await;

    let body = serde_json::json!({
        "items": [
            {"productId": "mug-1", "variantId": "v1", "quantity": 2, "claimedPrice": "19.99"}
        ],
        "customerEmail": "ada@example.com"
    });
    let (status, _) = post_json(&app, "/checkout", &body).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    // A webhook receiver works from what the gateway stored: pull the
    // validated cart back out of the session-create request metadata
    let requests = app.gateway.received_requests().await.expect("requests");
    let request = requests.first().expect("one gateway call");
    let cart_json = url::form_urlencoded::parse(&request.body)
        .find(|(key, _)| key.as_ref() == "metadata[validated_cart]")
        .map(|(_, value)| value.into_owned())
        .expect("validated cart metadata");
    let items: Vec<ValidatedLineItem> = serde_json::from_str(&cart_json).expect("cart items");

    let outcome = app
        .ledger
        .create_if_absent(OrderDraft {
            payment_session_id: PaymentSessionId::from("cs_test_123"),
            payment_intent_id: Some(PaymentIntentId::from("pi_test_1")),
            customer_email: Email::parse("ada@example.com").expect("email"),
            customer_name: "Ada Lovelace".to_string(),
            shipping_address: address(),
            items,
            shipping_amount: Decimal::ZERO,
            currency: CurrencyCode::USD,
            metadata: serde_json::json!({}),
        })
        .await
        .expect("create order");

    assert!(outcome.created);
    assert_eq!(outcome.order.status, OrderStatus::PendingPayment);
    // Total comes from the validated cart: 2 x 19.99, free standard shipping
    assert_eq!(outcome.order.total_amount, dec!(39.98));
    let line = outcome.order.items.first().expect("line item");
    assert_eq!(line.unit_amount, dec!(19.99));
    assert_eq!(line.quantity, 2);

    // The same session id looked up later returns this order
    let fetched = app
        .ledger
        .get_by_payment_session_id(&PaymentSessionId::from("cs_test_123"))
        .await
        .expect("lookup")
        .expect("order row");
    assert_eq!(fetched.id, outcome.order.id);
}

// =============================================================================
// Idempotent Creation
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_duplicate_webhook_deliveries_create_one_order() {
    let ledger = ledger();

    // Four deliveries of the same completed-payment event, racing
    let mut handles = Vec::new();
    for _ in 0..4 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.create_if_absent(draft("cs_dup")).await
        }));
    }

    let mut created = 0_u32;
    let mut ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.expect("join").expect("create");
        created += u32::from(outcome.created);
        ids.push(outcome.order.id);
    }

    assert_eq!(created, 1);
    let first = ids.first().expect("ids");
    assert!(ids.iter().all(|id| id == first));
    assert_eq!(ledger.count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_retried_delivery_returns_the_original_row() {
    let ledger = ledger();
    let first = ledger.create_if_absent(draft("cs_retry")).await.expect("create");

    // A retry hours later carries the same session id
    let mut retry = draft("cs_retry");
    retry.customer_name = "Someone Else".to_string();
    let second = ledger.create_if_absent(retry).await.expect("create");

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.order.id, first.order.id);
    // The original row wins; the retry's payload is ignored
    assert_eq!(second.order.customer_name, "Grace Hopper");
}

// =============================================================================
// Fulfillment Lifecycle
// =============================================================================

#[tokio::test]
async fn test_fulfilled_to_paid_is_rejected_without_mutation() {
    let ledger = ledger();
    let order = ledger
        .create_if_absent(draft("cs_life"))
        .await
        .expect("create")
        .order;

    for status in [
        OrderStatus::Paid,
        OrderStatus::FulfillmentRequested,
        OrderStatus::Fulfilled,
    ] {
        ledger
            .update_fulfillment_status(order.id, status, None, None)
            .await
            .expect("legal transition");
    }
    let before = ledger.get_by_id(order.id).await.expect("get").expect("row");

    let err = ledger
        .update_fulfillment_status(order.id, OrderStatus::Paid, None, None)
        .await
        .expect_err("backwards transition");
    assert!(matches!(
        err,
        LedgerError::IllegalTransition {
            from: OrderStatus::Fulfilled,
            to: OrderStatus::Paid,
        }
    ));

    let after = ledger.get_by_id(order.id).await.expect("get").expect("row");
    assert_eq!(after.status, OrderStatus::Fulfilled);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn test_refund_requires_a_completed_payment() {
    let ledger = ledger();
    let order = ledger
        .create_if_absent(draft("cs_refund"))
        .await
        .expect("create")
        .order;

    // Still pending payment: nothing to refund yet
    let err = ledger
        .update_fulfillment_status(order.id, OrderStatus::Refunded, None, None)
        .await
        .expect_err("refund before payment");
    assert!(matches!(err, LedgerError::IllegalTransition { .. }));

    ledger
        .update_fulfillment_status(order.id, OrderStatus::Paid, None, None)
        .await
        .expect("paid");
    let refunded = ledger
        .update_fulfillment_status(order.id, OrderStatus::Refunded, Some("refunded"), None)
        .await
        .expect("refund after payment");
    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert_eq!(refunded.provider_status.as_deref(), Some("refunded"));
}
