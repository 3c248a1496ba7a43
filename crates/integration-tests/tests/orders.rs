//! Order status lifecycle and deletion through the admin API.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;
use whitelabel_integration_tests::{TestApp, checkout_body};

async fn order(app: &TestApp) -> String {
    let tee = app
        .store
        .seed_product("Classic Tee", Decimal::new(2500, 2), 10)
        .await;
    let (_, response) = app
        .post(
            "/api/checkout",
            checkout_body(&[(&tee.id.to_string(), "25.00", 1)]),
        )
        .await;
    response["orderId"].as_str().unwrap().to_string()
}

async fn set_status(app: &TestApp, id: &str, status: &str) -> (StatusCode, serde_json::Value) {
    app.post(
        &format!("/admin/api/orders/{id}/status"),
        json!({ "status": status }),
    )
    .await
}

#[tokio::test]
async fn test_full_lifecycle_to_completed() {
    let app = TestApp::new();
    let id = order(&app).await;

    for next in ["PAID", "SHIPPED", "COMPLETED"] {
        let (status, body) = set_status(&app, &id, next).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], next);
    }

    let (_, listing) = app.get("/admin/api/orders").await;
    assert_eq!(listing[0]["status"], "COMPLETED");
}

#[tokio::test]
async fn test_skipping_a_step_is_rejected() {
    let app = TestApp::new();
    let id = order(&app).await;

    let (status, body) = set_status(&app, &id, "SHIPPED").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BusinessRuleViolation");

    let (_, current) = app.get(&format!("/admin/api/orders/{id}")).await;
    assert_eq!(current["status"], "PENDING");
}

#[tokio::test]
async fn test_terminal_status_cannot_change() {
    let app = TestApp::new();
    let id = order(&app).await;

    let (status, _) = set_status(&app, &id, "CANCELLED").await;
    assert_eq!(status, StatusCode::OK);

    for next in ["PENDING", "PAID", "SHIPPED", "COMPLETED", "CANCELLED"] {
        let (status, _) = set_status(&app, &id, next).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{next}");
    }
}

#[tokio::test]
async fn test_unknown_status_value_is_rejected() {
    let app = TestApp::new();
    let id = order(&app).await;

    let (status, _) = set_status(&app, &id, "REFUNDED").await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app
        .get("/admin/api/orders/7f0c7c9e-52a4-4a4e-9a1b-0d6c9a8f3b11")
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_delete_removes_items_and_invoice() {
    let app = TestApp::new();
    let id = order(&app).await;
    assert_eq!(app.store.invoice_count().await, 1);

    let (status, _) = app
        .request(Method::DELETE, &format!("/admin/api/orders/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(app.store.order_count().await, 0);
    assert_eq!(app.store.order_item_count().await, 0);
    assert_eq!(app.store.invoice_count().await, 0);

    let (status, _) = app.get(&format!("/admin/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::DELETE, &format!("/admin/api/orders/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
