//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Storefront API
//! GET  /api/products                    - Product listing (q, minPrice, maxPrice, sort, page)
//! GET  /api/products/{id}               - Product detail
//! POST /api/checkout                    - Checkout (order or Stripe redirect)
//! GET  /api/invoices/{orderId}          - Invoice HTML
//! GET  /api/settings                    - Store configuration
//! POST /api/payments/stripe/webhook     - Stripe callback
//! POST /api/contact                     - Contact form
//!
//! # Admin API (bearer token)
//! GET    /admin/api/orders              - Order listing
//! GET    /admin/api/orders/{id}         - Order detail
//! DELETE /admin/api/orders/{id}         - Cascade delete
//! POST   /admin/api/orders/{id}/status  - Status transition
//! POST   /admin/api/products            - Create product
//! PUT    /admin/api/products/{id}       - Update product
//! GET    /admin/api/webhooks            - Subscription listing
//! POST   /admin/api/webhooks            - Create subscription
//! PATCH  /admin/api/webhooks/{id}       - Update subscription
//! DELETE /admin/api/webhooks/{id}       - Delete subscription
//! POST   /admin/api/webhooks/{id}/regenerate - New secret
//! GET    /admin/api/settings            - Store configuration
//! POST   /admin/api/settings            - Update store configuration
//! GET    /admin/api/contacts            - Contact messages
//! DELETE /admin/api/contacts/{id}       - Delete message
//! POST   /admin/api/contacts/{id}/status - Mark new, read or replied
//! ```

pub mod checkout;
pub mod contacts;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod products;
pub mod settings;
pub mod webhooks;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::state::AppState;

/// Public storefront API.
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/checkout", post(checkout::checkout))
        .route("/invoices/{order_id}", get(invoices::show))
        .route("/settings", get(settings::show))
        .route("/payments/stripe/webhook", post(payments::stripe_webhook))
        .route("/contact", post(contacts::submit))
}

/// Admin API. Every handler takes the `RequireAdmin` extractor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show).delete(orders::destroy))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/products", post(products::create))
        .route("/products/{id}", put(products::update))
        .route("/webhooks", get(webhooks::index).post(webhooks::create))
        .route(
            "/webhooks/{id}",
            patch(webhooks::update).delete(webhooks::destroy),
        )
        .route("/webhooks/{id}/regenerate", post(webhooks::regenerate))
        .route("/settings", get(settings::admin_show).post(settings::update))
        .route("/contacts", get(contacts::index))
        .route("/contacts/{id}", delete(contacts::destroy))
        .route("/contacts/{id}/status", post(contacts::update_status))
}

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", storefront_routes())
        .nest("/admin/api", admin_routes())
}
