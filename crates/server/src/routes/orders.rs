//! Admin order handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;
use whitelabel_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderDetail};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// All orders with items, newest first.
pub async fn index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderDetail>>> {
    let orders = state.orders().list().await?;
    Ok(Json(orders.as_ref().clone()))
}

#[instrument(skip(state))]
pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(state.orders().get(id).await?))
}

/// Move an order along its lifecycle.
#[instrument(skip(state))]
pub async fn update_status(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().update_status(id, update.status).await?))
}

/// Delete an order with its items and invoice.
#[instrument(skip(state))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    state.orders().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
