//! Contact form handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use whitelabel_core::{ContactId, ContactStatus};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Contact, ContactInput};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Submitted {
    pub success: bool,
    pub id: ContactId,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ContactStatus,
}

/// Storefront contact form.
#[instrument(skip(state, input))]
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<Submitted>)> {
    let contact = state.contacts().submit(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(Submitted {
            success: true,
            id: contact.id,
        }),
    ))
}

/// Inbox, newest first.
pub async fn index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Contact>>> {
    Ok(Json(state.contacts().list().await?))
}

#[instrument(skip(state))]
pub async fn update_status(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Contact>> {
    Ok(Json(state.contacts().set_status(id, update.status).await?))
}

#[instrument(skip(state))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
) -> Result<StatusCode> {
    state.contacts().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
