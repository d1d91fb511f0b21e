//! Order endpoints over HTTP.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use orderflow_api::services::OrderStore;
use orderflow_core::{OrderId, OrderStatus};
use orderflow_integration_tests::{OPERATOR_TOKEN, TestApp, checkout_body};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn create(app: &TestApp) -> Value {
    let (status, body) = app.post("/api/orders", &checkout_body()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn order_id(created: &Value) -> OrderId {
    created["id"].as_str().unwrap().parse().unwrap()
}

// =============================================================================
// POST /api/orders
// =============================================================================

#[tokio::test]
async fn test_create_returns_created_order() {
    let app = TestApp::new();
    let body = create(&app).await;

    assert_eq!(body["status"], "pending");
    assert_eq!(body["total"], "24.98");
    assert_eq!(body["total_mismatch"], false);
    assert_eq!(body["code"].as_str().unwrap().len(), 9);
    assert_eq!(body["notifications"][0]["recipient"], "customer");
    assert_eq!(body["notifications"][0]["status"], "sent");
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_create_flags_mismatched_total() {
    let app = TestApp::new();
    let mut request = checkout_body();
    request["total"] = json!(100);

    let (status, body) = app.post("/api/orders", &request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], "24.98");
    assert_eq!(body["total_mismatch"], true);
}

#[tokio::test]
async fn test_create_validation_lists_every_field() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/orders", &json!({ "name": "Nobody" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    for field in ["email", "items", "payment_method"] {
        assert!(fields.contains(&field), "missing {field} in {fields:?}");
    }
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_create_rejects_overflowing_price() {
    let app = TestApp::new();
    let mut request = checkout_body();
    request["items"] = json!([
        { "name": "X", "price": "79228162514264337593543950335", "qty": 2 }
    ]);

    let (status, body) = app.post("/api/orders", &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["fields"], json!(["items[0].price"]));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_create_rejects_amounts_beyond_storable_range() {
    let app = TestApp::new();

    let mut request = checkout_body();
    request["items"] = json!([{ "name": "X", "price": "99999999999999999", "qty": 1 }]);
    let (status, body) = app.post("/api/orders", &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["items[0].price"]));

    let mut request = checkout_body();
    request["items"] = json!([{ "name": "X", "price": "5000000000", "qty": 2 }]);
    let (status, body) = app.post("/api/orders", &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["items[0].price"]));

    let mut request = checkout_body();
    request["subtotal_cents"] = json!(i64::MAX);
    let (status, body) = app.post("/api/orders", &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["subtotal_cents"]));

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = TestApp::builder()
        .lifecycle(|l| l.max_proof_bytes = 1024)
        .build();
    let created = create(&app).await;

    let request = json!({
        "orderId": created["code"],
        "imageData": "A".repeat(200 * 1024),
    });
    let (status, body) = app.post("/api/orders/proof", &request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));
    assert!(app.proofs.keys().await.is_empty());
}

#[tokio::test]
async fn test_wrong_shape_is_a_field_error() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/orders", &json!(["not", "an", "object"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["fields"], json!(["body"]));
}

#[tokio::test]
async fn test_malformed_json() {
    let app = TestApp::new();
    let (status, body) = app
        .request(Method::POST, "/api/orders", Some("{not json"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON" }));
}

#[tokio::test]
async fn test_wrong_method_and_preflight() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "Method Not Allowed" }));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/orders/tracking")
                .header(header::ORIGIN, "https://shop.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let allow = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(allow.contains("POST"));
}

#[tokio::test]
async fn test_request_id_round_trip() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "edge-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "edge-42");
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

// =============================================================================
// POST /api/orders/proof
// =============================================================================

#[tokio::test]
async fn test_proof_upload_by_code() {
    let app = TestApp::new();
    let created = create(&app).await;
    let code = created["code"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/orders/proof",
            &json!({
                "orderId": code,
                "imageData": "data:image/jpeg;base64,/9j/4AAQ",
                "email": "buyer@example.com",
                "amount": 24.98
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["orderId"], code);
    assert_eq!(body["amount"], 24.98);
    assert_eq!(body["status"], "pending");
    let key = body["key"].as_str().unwrap();
    assert!(key.ends_with(".jpeg") || key.ends_with(".jpg"));
    assert_eq!(app.proofs.keys().await, vec![key.to_owned()]);
}

#[tokio::test]
async fn test_numeric_order_id_is_looked_up() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/orders/proof",
            &json!({ "orderId": 123, "imageData": "aGVsbG8=" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["error"], "Not found: order 123");

    let (status, _) = app
        .post_as_operator("/api/orders/mark-paid", &json!({ "id": 42 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/api/orders/proof",
            &json!({ "orderId": { "code": "AB1234567" }, "imageData": "aGVsbG8=" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["orderId"]));
}

#[tokio::test]
async fn test_proof_missing_fields() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/orders/proof", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["orderId", "imageData"]));
}

#[tokio::test]
async fn test_proof_unknown_order() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/api/orders/proof",
            &json!({ "orderId": "ZZ9999999", "imageData": "aGVsbG8=" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.proofs.keys().await.is_empty());
}

// =============================================================================
// Operator endpoints
// =============================================================================

#[tokio::test]
async fn test_operator_endpoints_require_token() {
    let app = TestApp::new();
    let created = create(&app).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = app.post("/api/orders/mark-paid", &json!({ "id": id })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/orders/tracking",
            Some(&json!({ "id": id, "tracking_number": "1Z1" }).to_string()),
            Some("not-the-token"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stored = app.store.get(order_id(&created)).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_full_lifecycle_over_http() {
    let app = TestApp::new();
    let created = create(&app).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .post_as_operator("/api/orders/mark-paid", &json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "paid");
    assert_eq!(body["changed"], true);

    let (_, again) = app
        .post_as_operator("/api/orders/mark-paid", &json!({ "id": id }))
        .await;
    assert_eq!(again["changed"], false);

    app.notifier.clear();
    let (status, body) = app
        .post_as_operator(
            "/api/orders/tracking",
            &json!({ "id": id, "tracking_number": "1Z999AA1", "carrier": "ups" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "fulfilled");
    assert_eq!(body["tracking"]["carrier"], "UPS");
    assert_eq!(body["notification"]["status"], "sent");
    assert_eq!(app.notifier.sent().len(), 1);

    let (status, _) = app
        .post_as_operator("/api/orders/mark-paid", &json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_numeric_tracking_number() {
    let app = TestApp::new();
    let created = create(&app).await;
    app.post_as_operator("/api/orders/mark-paid", &json!({ "id": created["id"] }))
        .await;

    let (status, body) = app
        .post_as_operator(
            "/api/orders/tracking",
            &json!({ "id": created["code"], "tracking_number": 9_400_100_000_000_001_u64 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["tracking"]["number"], "9400100000000001");
}

#[tokio::test]
async fn test_concurrent_change_conflicts() {
    let app = TestApp::builder()
        .concurrent_writer(OrderStatus::Fulfilled)
        .build();
    let created = create(&app).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .post_as_operator("/api/orders/mark-paid", &json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert!(body["error"].as_str().unwrap().contains("concurrently"));

    let stored = app.store.get(order_id(&created)).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Fulfilled);
    assert_eq!(stored.payment_proof, None);
}

#[tokio::test]
async fn test_proof_losing_race_leaves_no_blob() {
    let app = TestApp::builder()
        .concurrent_writer(OrderStatus::Paid)
        .build();
    let created = create(&app).await;

    let (status, _) = app
        .post(
            "/api/orders/proof",
            &json!({ "orderId": created["code"], "imageData": "aGVsbG8=" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.proofs.keys().await.is_empty());
}

#[tokio::test]
async fn test_tracking_before_payment_conflicts() {
    let app = TestApp::new();
    let created = create(&app).await;
    app.notifier.clear();

    let (status, _) = app
        .post_as_operator(
            "/api/orders/tracking",
            &json!({ "id": created["id"], "tracking_number": "1Z1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_tracking_validation() {
    let app = TestApp::new();
    let (status, body) = app
        .post_as_operator("/api/orders/tracking", &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["id", "tracking_number"]));
}

#[tokio::test]
async fn test_mark_paid_unknown_order() {
    let app = TestApp::new();
    let (status, body) = app
        .post_as_operator(
            "/api/orders/mark-paid",
            &json!({ "id": OrderId::generate().to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("Not found"));
}

#[tokio::test]
async fn test_operator_token_scheme_is_case_insensitive() {
    let app = TestApp::new();
    let created = create(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/orders/mark-paid")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("bearer {OPERATOR_TOKEN}"))
                .body(Body::from(json!({ "id": created["id"] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
