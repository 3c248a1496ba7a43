//! Admin webhook subscription handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;
use whitelabel_core::WebhookId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Webhook, WebhookUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWebhook {
    pub url: String,
    pub events: Vec<String>,
}

pub async fn index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Webhook>>> {
    Ok(Json(state.webhooks().list().await?))
}

/// Create a subscription. The response includes the generated secret.
#[instrument(skip(state, body))]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateWebhook>,
) -> Result<(StatusCode, Json<Webhook>)> {
    let hook = state.webhooks().create(&body.url, &body.events).await?;
    Ok((StatusCode::CREATED, Json(hook)))
}

#[instrument(skip(state, update))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<WebhookId>,
    Json(update): Json<WebhookUpdate>,
) -> Result<Json<Webhook>> {
    Ok(Json(state.webhooks().update(id, update).await?))
}

#[instrument(skip(state))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<WebhookId>,
) -> Result<StatusCode> {
    state.webhooks().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue a new secret; the old one stops working immediately.
#[instrument(skip(state))]
pub async fn regenerate(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<WebhookId>,
) -> Result<Json<Webhook>> {
    Ok(Json(state.webhooks().regenerate_secret(id).await?))
}
