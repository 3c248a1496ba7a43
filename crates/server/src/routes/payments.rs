//! Payment gateway callbacks.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use whitelabel_core::OrderStatus;

use crate::error::{AppError, Result};
use crate::services::payments::checkout_from_session;
use crate::services::payments::stripe::{CHECKOUT_COMPLETED, SIGNATURE_HEADER};
use crate::state::AppState;

/// Stripe callback.
///
/// A completed Checkout Session creates the order from the session metadata
/// and marks it paid. Other event types are acknowledged and ignored.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let stripe = state
        .stripe()
        .ok_or_else(|| AppError::NotFound("Payment gateway".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {SIGNATURE_HEADER} header")))?;

    let event = stripe.verify_event(&body, signature, Utc::now())?;
    if event.event_type != CHECKOUT_COMPLETED {
        debug!(event_type = %event.event_type, "Ignoring Stripe event");
        return Ok(Json(json!({ "received": true })));
    }

    let request = checkout_from_session(&event.data.object)?;
    let checkout = request.validate().map_err(AppError::Validation)?;
    let detail = state.checkout().place_order(&checkout).await?;
    state
        .orders()
        .update_status(detail.order.id, OrderStatus::Paid)
        .await?;

    info!(
        stripe_event_id = %event.id,
        order_id = %detail.order.id,
        "Order created from completed checkout session"
    );
    Ok(Json(json!({ "received": true })))
}
