//! REST surface driven through the router without a socket

mod common;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::models::{CatalogChanges, CatalogSnapshot, Order, OrderStatus, OrderSummary};
use shop_client::ErrorCode;
use shop_server::api::build_app;
use tower::ServiceExt;

use common::{product, start_state};

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn address() -> Value {
    json!({
        "name": "Asha",
        "phone": "555-0100",
        "street": "1 Main St",
        "city": "Pune",
        "state": "MH",
        "postalCode": "411001",
        "addressType": "Home"
    })
}

async fn place_order(app: &Router, user: &str) -> Order {
    let (status, body) = call(
        app,
        "POST",
        "/order/new-order",
        Some(json!({
            "userId": user,
            "items": [{"productId": "p-1", "quantity": 2}],
            "address": address(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    serde_json::from_value(body).unwrap()
}

async fn set_status(app: &Router, order_id: &str, status: &str) -> (StatusCode, Value) {
    call(
        app,
        "PUT",
        "/order/confirm-order",
        Some(json!({"orderId": order_id, "status": status})),
    )
    .await
}

fn error_code(body: &Value) -> u16 {
    body["code"].as_u64().unwrap() as u16
}

#[tokio::test]
async fn test_order_snapshots_price() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);

    let order = place_order(&app, "u-1").await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Decimal::from(200));
    assert_eq!(order.items[0].unit_price, Decimal::from(100));
}

#[tokio::test]
async fn test_pending_cannot_skip_to_shipped() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);
    let order = place_order(&app, "u-1").await;

    let (status, body) = set_status(&app, &order.id, "Shipped").await;
    assert!(!status.is_success());
    assert_eq!(error_code(&body), ErrorCode::InvalidTransition.code());

    let (status, body) = set_status(&app, &order.id, "Processing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Processing");
}

#[tokio::test]
async fn test_delivered_order_cannot_be_rejected() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);
    let order = place_order(&app, "u-1").await;

    for next in ["Processing", "Shipped", "Delivered"] {
        let (status, _) = set_status(&app, &order.id, next).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        &app,
        "PUT",
        "/order/reject-order",
        Some(json!({"orderId": order.id})),
    )
    .await;
    assert!(!status.is_success());
    assert_eq!(error_code(&body), ErrorCode::InvalidTransition.code());

    let (_, body) = call(&app, "GET", &format!("/order/{}", order.id), None).await;
    assert_eq!(body["status"], "Delivered");
}

#[tokio::test]
async fn test_reject_pending_order() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);
    let order = place_order(&app, "u-1").await;

    let (status, body) = call(
        &app,
        "PUT",
        "/order/reject-order",
        Some(json!({"orderId": order.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Cancelled");
}

#[tokio::test]
async fn test_order_validation_errors() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);

    let (status, body) = call(
        &app,
        "POST",
        "/order/new-order",
        Some(json!({"userId": "u-1", "items": [], "address": address()})),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(error_code(&body), ErrorCode::OrderEmpty.code());

    let (status, body) = call(
        &app,
        "POST",
        "/order/new-order",
        Some(json!({
            "userId": "u-1",
            "items": [{"productId": "ghost", "quantity": 1}],
            "address": address(),
        })),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(error_code(&body), ErrorCode::ProductNotFound.code());

    // structurally invalid body still answers with an error body
    let (status, body) = call(&app, "POST", "/order/new-order", Some(json!({"userId": 5}))).await;
    assert!(status.is_client_error());
    assert!(body["code"].is_u64());
    assert!(state.orders.list_all().is_empty());
}

#[tokio::test]
async fn test_orders_by_user_and_summary() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);

    let first = place_order(&app, "u-1").await;
    let second = place_order(&app, "u-1").await;
    place_order(&app, "u-2").await;

    set_status(&app, &first.id, "Processing").await;
    call(
        &app,
        "PUT",
        "/order/reject-order",
        Some(json!({"orderId": second.id})),
    )
    .await;

    let (_, body) = call(
        &app,
        "POST",
        "/order/get-user-orders",
        Some(json!({"userId": "u-1"})),
    )
    .await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);

    let (_, body) = call(&app, "POST", "/order/get-all-orders", None).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 3);

    let (_, body) = call(&app, "GET", "/order/summary", None).await;
    let summary: OrderSummary = serde_json::from_value(body).unwrap();
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.active, 1);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.total, 3);
}

#[tokio::test]
async fn test_catalog_read_endpoints() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let app = build_app(&state);

    let (status, body) = call(
        &app,
        "POST",
        "/product/new-product",
        Some(json!({
            "id": "p-2",
            "name": "Paneer",
            "category": "Dairy",
            "price": "80.50",
            "stock": 12,
            "quantityUnit": "Gram"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["version"], 1);

    let (_, body) = call(&app, "GET", "/product/all", None).await;
    let snapshot: CatalogSnapshot = serde_json::from_value(body).unwrap();
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.products.len(), 2);

    let (_, body) = call(&app, "GET", "/product/changes?since=0", None).await;
    let changes: CatalogChanges = serde_json::from_value(body).unwrap();
    assert!(!changes.full_refetch);
    assert_eq!(changes.products.len(), 1);
    assert_eq!(changes.products[0].id, "p-2");

    let (_, body) = call(&app, "GET", "/product/changes?since=42", None).await;
    assert_eq!(body["fullRefetch"], true);

    let (status, body) = call(&app, "GET", "/product/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), ErrorCode::ProductNotFound.code());

    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, "GET", "/catalog/everything", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), ErrorCode::NotFound.code());
}
