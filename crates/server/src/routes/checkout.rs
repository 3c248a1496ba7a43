//! Checkout handler.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{info, instrument};
use whitelabel_core::OrderId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::checkout::CheckoutRequest;
use crate::services::payments::checkout_metadata;
use crate::services::payments::stripe::{SessionLine, SessionRequest};
use crate::state::AppState;

/// Response when Stripe takes over payment.
#[derive(Debug, Serialize)]
pub struct CheckoutRedirect {
    pub url: String,
}

/// Response when the order was created directly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub success: bool,
    pub order_id: OrderId,
}

/// Validate the cart, then either hand off to Stripe or create the order.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response> {
    let checkout = request.validate().map_err(AppError::Validation)?;

    if let Some(stripe) = state.stripe() {
        let products = state.checkout().check_availability(&checkout.cart).await?;
        let currency = state.store_config().get().await?.currency_code();

        let lines = request
            .items
            .iter()
            .map(|item| {
                let fallback = products
                    .get(&item.product_id)
                    .map_or("Product", |p| p.name.as_str());
                SessionLine::from_item(item, fallback, currency)
            })
            .collect();

        let base_url = &state.config().base_url;
        let session = SessionRequest {
            lines,
            success_url: format!("{base_url}/checkout/success"),
            cancel_url: format!("{base_url}/checkout"),
            metadata: checkout_metadata(&request)?,
        };

        let url = stripe.create_checkout_session(&session).await?;
        add_breadcrumb("checkout", "Redirected to Stripe Checkout", None);
        return Ok(Json(CheckoutRedirect { url }).into_response());
    }

    let detail = state.checkout().place_order(&checkout).await?;
    let order_id = detail.order.id.to_string();
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", order_id.as_str())]),
    );
    info!(order_id = %detail.order.id, "Checkout completed");

    Ok(Json(OrderPlaced {
        success: true,
        order_id: detail.order.id,
    })
    .into_response())
}
