//! Integration tests for the White Label Shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p whitelabel-integration-tests
//! ```
//!
//! Tests drive the full router in-process over [`MemoryStore`], so no database
//! is needed. Webhook deliveries go to a [`RecordingDeliverer`] unless a test
//! binds a real receiver.
//!
//! # Test Categories
//!
//! - `checkout` - Order creation, stock and validation
//! - `webhooks` - Fan-out, signatures and subscription management
//! - `orders` - Status lifecycle and deletion
//! - `settings` - Store configuration cache
//! - `products` - Catalog search, sorting, paging and admin writes
//! - `contacts` - Contact form and admin inbox
//! - `payments` - Stripe hand-off and completion callback
//! - `admin_auth` - Bearer token guard
//! - `request_id` - Request ID header propagation

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use whitelabel_server::config::ServerConfig;
use whitelabel_server::db::MemoryStore;
use whitelabel_server::services::webhooks::{Deliverer, Delivery, DeliveryError};
use whitelabel_server::state::AppState;

/// Admin token accepted by [`TestApp`] when built with [`TestApp::with_admin_token`].
pub const ADMIN_TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Configuration with only the required variables plus `extra`.
pub fn test_config(extra: &[(&str, &str)]) -> ServerConfig {
    let vars: Vec<(String, String)> = [
        ("SERVER_DATABASE_URL", "postgres://localhost/whitelabel_test"),
        ("BASE_URL", "http://localhost:3000"),
    ]
    .iter()
    .chain(extra)
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect();

    ServerConfig::from_lookup(|key| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}

/// Records every delivery. URLs containing `fail` answer 500.
#[derive(Debug, Default)]
pub struct RecordingDeliverer {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingDeliverer {
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .deliveries
            .lock()
            .await
            .iter()
            .map(|d| d.url.clone())
            .collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl Deliverer for RecordingDeliverer {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        self.deliveries.lock().await.push(delivery.clone());
        if delivery.url.contains("fail") {
            return Err(DeliveryError::Status(500));
        }
        Ok(())
    }
}

/// The application router over an in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub deliverer: Arc<RecordingDeliverer>,
    pub state: AppState,
    router: Router,
    token: Option<&'static str>,
}

impl TestApp {
    /// No admin token configured, no payment gateway.
    pub fn new() -> Self {
        Self::with_config(test_config(&[]), None)
    }

    pub fn with_admin_token() -> Self {
        Self::with_config(
            test_config(&[("ADMIN_API_TOKEN", ADMIN_TOKEN)]),
            Some(ADMIN_TOKEN),
        )
    }

    pub fn with_config(config: ServerConfig, token: Option<&'static str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::default());
        let state = AppState::from_parts(config, store.clone(), None, deliverer.clone()).unwrap();
        let router = whitelabel_server::app(state.clone());
        Self {
            store,
            deliverer,
            state,
            router,
            token,
        }
    }

    /// Send a request and return the status with the parsed JSON body
    /// (`Value::Null` for empty or non-JSON bodies).
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.raw(method, uri, body, self.token).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Send a request with an explicit bearer token (or none).
    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_raw(request).await
    }

    /// Send a prepared request, parsing the body as JSON.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    /// Subscribe `url` to `events` through the admin API and return the record.
    pub async fn subscribe(&self, url: &str, events: &[&str]) -> Value {
        let (status, hook) = self
            .post(
                "/admin/api/webhooks",
                serde_json::json!({ "url": url, "events": events }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{hook}");
        hook
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A checkout body for `(product_id, price, quantity)` lines with a
/// matching total.
pub fn checkout_body(lines: &[(&str, &str, i32)]) -> Value {
    use rust_decimal::Decimal;

    let mut total = Decimal::ZERO;
    let items: Vec<Value> = lines
        .iter()
        .map(|(id, price, quantity)| {
            let unit: Decimal = price.parse().unwrap();
            total += unit * Decimal::from(*quantity);
            serde_json::json!({ "productId": id, "price": price, "quantity": quantity })
        })
        .collect();

    serde_json::json!({ "items": items, "total": total.to_string() })
}
