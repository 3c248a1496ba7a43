//! Store configuration handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{StoreConfig, StoreConfigUpdate};
use crate::state::AppState;

/// Public store configuration (cached).
pub async fn show(State(state): State<AppState>) -> Result<Json<StoreConfig>> {
    Ok(Json(state.store_config().get().await?))
}

pub async fn admin_show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<StoreConfig>> {
    Ok(Json(state.store_config().get().await?))
}

/// Partial update; the cache is refreshed with the stored value.
#[instrument(skip(state, update))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(update): Json<StoreConfigUpdate>,
) -> Result<Json<StoreConfig>> {
    Ok(Json(state.store_config().update(update).await?))
}
