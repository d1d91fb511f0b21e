//! Lifecycle behavior against the in-memory adapters.

#![allow(clippy::unwrap_used)]

use orderflow_api::services::{DeliveryStatus, LifecycleError, OrderStore, Recipient};
use orderflow_core::{CreateOrderRequest, Money, OrderId, OrderStatus, Tracking};
use orderflow_integration_tests::{RecordingNotifier, TestApp, checkout_body, config_with};
use serde_json::{Value, json};

fn request(body: Value) -> CreateOrderRequest {
    serde_json::from_value(body).unwrap()
}

fn with(mut body: Value, key: &str, value: Value) -> Value {
    body.as_object_mut().unwrap().insert(key.to_owned(), value);
    body
}

fn without(mut body: Value, key: &str) -> Value {
    body.as_object_mut().unwrap().remove(key);
    body
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn test_total_is_recomputed_without_client_total() {
    let app = TestApp::new();
    let created = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap();
    assert_eq!(created.order.total, Money::from_cents(2498));
    assert_eq!(created.order.client_total, None);
    assert!(!created.order.total_mismatch);
}

#[tokio::test]
async fn test_client_total_is_overridden_and_flagged() {
    let app = TestApp::new();
    let body = with(checkout_body(), "subtotal_cents", json!(100));
    let created = app.lifecycle.create_order(&request(body)).await.unwrap();

    assert_eq!(created.order.total, Money::from_cents(2498));
    assert_eq!(created.order.client_total, Some(Money::from_cents(100)));
    assert!(created.order.total_mismatch);

    let stored = app.store.get(created.order.id).await.unwrap().unwrap();
    assert_eq!(stored.total, Money::from_cents(2498));
}

#[tokio::test]
async fn test_missing_fields_persist_nothing() {
    let app = TestApp::new();
    let body = without(without(checkout_body(), "email"), "payment_method");

    let err = app.lifecycle.create_order(&request(body)).await.unwrap_err();
    let LifecycleError::Validation(fields) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let missing = fields.missing_fields();
    assert!(missing.contains(&"email"));
    assert!(missing.contains(&"payment_method"));
    assert!(app.store.is_empty().await);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let app = TestApp::new();
    let body = with(checkout_body(), "items", json!([]));
    let err = app.lifecycle.create_order(&request(body)).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_collision_retries_with_fresh_code() {
    let app = TestApp::builder()
        .codes(&["AA0000001", "AA0000001", "BB0000002"])
        .build();

    let first = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap();
    let second = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap();

    assert_eq!(first.order.code.as_str(), "AA0000001");
    assert_eq!(second.order.code.as_str(), "BB0000002");
    assert_eq!(app.store.len().await, 2);
}

#[tokio::test]
async fn test_exhausted_collisions_conflict_without_partial_record() {
    let app = TestApp::builder().codes(&["AA0000001"]).build();
    let first = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap();
    app.notifier.clear();

    let err = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert_eq!(app.store.len().await, 1);
    assert!(app.store.get(first.order.id).await.unwrap().is_some());
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_method_gets_fallback_instructions() {
    let app = TestApp::new();
    let body = with(checkout_body(), "payment_method", json!("Money Order"));
    let created = app.lifecycle.create_order(&request(body)).await.unwrap();

    let sent = app.notifier.sent();
    let text = sent.first().unwrap().text.clone().unwrap();
    assert!(text.contains("via MONEY ORDER"));
    assert!(text.contains(created.order.code.as_str()));
    assert!(text.contains("$24.98"));
}

#[tokio::test]
async fn test_default_country_applied() {
    let app = TestApp::new();
    let created = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap();
    assert_eq!(created.order.shipping.country, "US");
    assert_eq!(created.order.billing, created.order.shipping);
}

#[tokio::test]
async fn test_default_country_disabled() {
    let app = TestApp::builder()
        .config(config_with(&[("DEFAULT_COUNTRY", "")]).unwrap())
        .build();
    let err = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap_err();
    let LifecycleError::Validation(fields) = err else {
        panic!("expected validation error");
    };
    assert_eq!(fields.missing_fields(), vec!["shipping.country"]);
}

#[tokio::test]
async fn test_notifier_failure_keeps_order() {
    let app = TestApp::builder()
        .notifier(RecordingNotifier::failing(500))
        .lifecycle(|l| l.fulfillment_email = Some("ship@shop.test".into()))
        .build();

    let created = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap();
    for recipient in [Recipient::Customer, Recipient::Fulfillment] {
        let notification = created.notifications.get(recipient).unwrap();
        assert_eq!(notification.status, DeliveryStatus::Failed);
    }
    assert_eq!(app.store.len().await, 1);
}

// =============================================================================
// Transitions
// =============================================================================

#[tokio::test]
async fn test_mark_paid_unknown_order_touches_nothing() {
    let app = TestApp::new();
    let existing = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;

    let err = app
        .lifecycle
        .confirm_payment(&OrderId::generate().to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));

    let stored = app.store.get(existing.id).await.unwrap().unwrap();
    assert_eq!(stored, existing);
}

#[tokio::test]
async fn test_tracking_twice_keeps_latest_and_notifies_each_time() {
    let app = TestApp::new();
    let order = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;
    let code = order.code.as_str();
    app.lifecycle.confirm_payment(code, None).await.unwrap();
    app.notifier.clear();

    let first = Tracking::new("9400100000000001", Some("usps"), None).unwrap();
    app.lifecycle.assign_tracking(code, first).await.unwrap();
    assert_eq!(app.notifier.sent().len(), 1);

    let second = Tracking::new("9400100000000002", Some("usps"), None).unwrap();
    let result = app.lifecycle.assign_tracking(code, second).await.unwrap();
    assert_eq!(app.notifier.sent().len(), 2);
    assert_eq!(result.order.status, OrderStatus::Fulfilled);

    let stored = app.store.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.tracking.unwrap().number, "9400100000000002");

    let last = app.notifier.sent().pop().unwrap();
    assert!(last.text.unwrap().contains("9400100000000002"));
}

#[tokio::test]
async fn test_plain_string_proof_defaults_to_png() {
    let app = TestApp::new();
    let order = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;

    let attached = app
        .lifecycle
        .attach_proof(&order.id.to_string(), "plainstring")
        .await
        .unwrap();
    assert!(attached.key.ends_with(".png"));

    let stored = app.proofs.get(&attached.key).await.unwrap();
    assert_eq!(stored.content_type, "image/png");
}

#[tokio::test]
async fn test_proof_marks_paid_when_policy_enabled() {
    let app = TestApp::builder()
        .lifecycle(|l| l.proof_marks_paid = true)
        .build();
    let order = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;

    let attached = app
        .lifecycle
        .attach_proof(order.code.as_str(), "data:image/webp;base64,UklGRg==")
        .await
        .unwrap();
    assert_eq!(attached.order.status, OrderStatus::Paid);
    assert!(attached.key.ends_with(".webp"));
}

#[tokio::test]
async fn test_proof_after_fulfillment_is_invalid_and_not_stored() {
    let app = TestApp::new();
    let order = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;
    let code = order.code.as_str();
    app.lifecycle.confirm_payment(code, None).await.unwrap();
    app.lifecycle
        .assign_tracking(code, Tracking::new("1Z1", None, None).unwrap())
        .await
        .unwrap();

    let err = app
        .lifecycle
        .attach_proof(code, "plainstring")
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition(_)));
    assert!(app.proofs.keys().await.is_empty());
}

#[tokio::test]
async fn test_lost_race_is_a_conflict_and_sends_nothing() {
    let app = TestApp::builder()
        .concurrent_writer(OrderStatus::Fulfilled)
        .build();
    let order = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;
    app.notifier.clear();

    let err = app
        .lifecycle
        .confirm_payment(order.code.as_str(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert!(app.notifier.sent().is_empty());

    let stored = app.store.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Fulfilled);
}

#[tokio::test]
async fn test_proof_is_removed_when_commit_loses() {
    let app = TestApp::builder()
        .concurrent_writer(OrderStatus::Paid)
        .build();
    let order = app
        .lifecycle
        .create_order(&request(checkout_body()))
        .await
        .unwrap()
        .order;

    let err = app
        .lifecycle
        .attach_proof(order.code.as_str(), "plainstring")
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert!(app.proofs.keys().await.is_empty());

    let stored = app.store.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_proof, None);
}
