//! Webhook fan-out, signatures and subscription management.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::post,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;
use whitelabel_core::webhook::{
    EVENT_HEADER, SIGNATURE_HEADER, SignatureError, WebhookEnvelope, verify_signature,
};
use whitelabel_integration_tests::{TestApp, checkout_body, test_config};
use whitelabel_server::db::MemoryStore;
use whitelabel_server::state::AppState;

async fn place_order(app: &TestApp) -> String {
    let tee = app
        .store
        .seed_product("Classic Tee", Decimal::new(2500, 2), 10)
        .await;
    let (status, response) = app
        .post(
            "/api/checkout",
            checkout_body(&[(&tee.id.to_string(), "25.00", 1)]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{response}");
    response["orderId"].as_str().unwrap().to_string()
}

// =============================================================================
// Fan-out
// =============================================================================

#[tokio::test]
async fn test_order_created_reaches_matching_active_subscribers_only() {
    let app = TestApp::new();
    app.subscribe("https://a.example.com/hook", &["order.created"])
        .await;
    app.subscribe("https://b.example.com/hook", &["*"]).await;
    app.subscribe("https://c.example.com/hook", &["order.updated"])
        .await;
    let inactive = app
        .subscribe("https://d.example.com/hook", &["order.created"])
        .await;
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/admin/api/webhooks/{}", inactive["id"].as_str().unwrap()),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    place_order(&app).await;

    assert_eq!(
        app.deliverer.urls().await,
        vec![
            "https://a.example.com/hook".to_string(),
            "https://b.example.com/hook".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_deliveries_are_signed_with_each_subscription_secret() {
    let app = TestApp::new();
    let first = app
        .subscribe("https://a.example.com/hook", &["order.created"])
        .await;
    let second = app
        .subscribe("https://b.example.com/hook", &["order.created"])
        .await;
    let order_id = place_order(&app).await;

    let deliveries = app.deliverer.deliveries().await;
    assert_eq!(deliveries.len(), 2);

    for hook in [&first, &second] {
        let delivery = deliveries
            .iter()
            .find(|d| d.url == hook["url"].as_str().unwrap())
            .unwrap();
        let secret = hook["secret"].as_str().unwrap();
        verify_signature(secret, &delivery.body, &delivery.signature).unwrap();

        let envelope: WebhookEnvelope = serde_json::from_slice(&delivery.body).unwrap();
        assert_eq!(envelope.event, "order.created");
        assert_eq!(envelope.data["orderId"], order_id.as_str());
        assert_eq!(envelope.data["total"], "25.00");
        assert_eq!(envelope.data["items"][0]["name"], "Classic Tee");
    }
}

#[tokio::test]
async fn test_failing_subscriber_does_not_fail_checkout() {
    let app = TestApp::new();
    app.subscribe("https://fail.example.com/hook", &["*"]).await;
    app.subscribe("https://ok.example.com/hook", &["*"]).await;

    place_order(&app).await;

    assert_eq!(app.deliverer.deliveries().await.len(), 2);
    assert_eq!(app.store.order_count().await, 1);
}

#[tokio::test]
async fn test_status_change_emits_order_updated() {
    let app = TestApp::new();
    app.subscribe("https://a.example.com/hook", &["order.updated"])
        .await;
    let order_id = place_order(&app).await;
    assert!(app.deliverer.deliveries().await.is_empty());

    let (status, _) = app
        .post(
            &format!("/admin/api/orders/{order_id}/status"),
            json!({ "status": "PAID" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let deliveries = app.deliverer.deliveries().await;
    assert_eq!(deliveries.len(), 1);
    let envelope: WebhookEnvelope = serde_json::from_slice(&deliveries[0].body).unwrap();
    assert_eq!(envelope.event, "order.updated");
    assert_eq!(envelope.data["status"], "PAID");
    assert_eq!(envelope.data["previousStatus"], "PENDING");
}

// =============================================================================
// Subscription management
// =============================================================================

#[tokio::test]
async fn test_regenerated_secret_replaces_old_one() {
    let app = TestApp::new();
    let hook = app
        .subscribe("https://a.example.com/hook", &["order.created"])
        .await;
    let old_secret = hook["secret"].as_str().unwrap().to_string();
    assert_eq!(old_secret.len(), 64);

    let (status, regenerated) = app
        .post(
            &format!("/admin/api/webhooks/{}/regenerate", hook["id"].as_str().unwrap()),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_secret = regenerated["secret"].as_str().unwrap();
    assert_ne!(new_secret, old_secret);

    place_order(&app).await;

    let delivery = &app.deliverer.deliveries().await[0];
    verify_signature(new_secret, &delivery.body, &delivery.signature).unwrap();
    assert_eq!(
        verify_signature(&old_secret, &delivery.body, &delivery.signature),
        Err(SignatureError::Mismatch)
    );
}

#[tokio::test]
async fn test_invalid_subscription_is_rejected() {
    let app = TestApp::new();

    let (status, error) = app
        .post(
            "/admin/api/webhooks",
            json!({ "url": "ftp://example.com", "events": ["order.shipped"] }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["fields"]["url"].is_array());
    assert!(error["fields"]["events"].is_array());
}

#[tokio::test]
async fn test_deleted_subscription_receives_nothing() {
    let app = TestApp::new();
    let hook = app.subscribe("https://a.example.com/hook", &["*"]).await;

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/admin/api/webhooks/{}", hook["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    place_order(&app).await;
    assert!(app.deliverer.deliveries().await.is_empty());

    let (_, list) = app.get("/admin/api/webhooks").await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

// =============================================================================
// Real HTTP delivery
// =============================================================================

type Received = Arc<Mutex<Vec<(HeaderMap, Bytes)>>>;

async fn receive(State(received): State<Received>, headers: HeaderMap, body: Bytes) -> StatusCode {
    received.lock().await.push((headers, body));
    StatusCode::OK
}

#[tokio::test]
async fn test_http_delivery_to_local_receiver() {
    let received: Received = Arc::default();
    let receiver = Router::new()
        .route("/hook", post(receive))
        .with_state(received.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, receiver).await.unwrap();
    });

    let store = Arc::new(MemoryStore::new());
    let product = store
        .seed_product("Classic Tee", Decimal::new(2500, 2), 3)
        .await;
    let state = AppState::with_store(test_config(&[]), store, None).unwrap();
    let hook = state
        .webhooks()
        .create(&format!("http://{addr}/hook"), &["order.created".to_string()])
        .await
        .unwrap();
    let app = whitelabel_server::app(state);

    let body: Value = checkout_body(&[(&product.id.to_string(), "25.00", 1)]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = received.lock().await;
    assert_eq!(received.len(), 1);
    let (headers, payload) = &received[0];
    assert_eq!(headers[EVENT_HEADER], "order.created");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let signature = headers[SIGNATURE_HEADER].to_str().unwrap();
    verify_signature(&hook.secret, payload, signature).unwrap();
}
