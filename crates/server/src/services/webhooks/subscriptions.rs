//! Webhook subscription management.

use std::sync::Arc;

use tracing::{info, instrument};
use whitelabel_core::WebhookId;
use whitelabel_core::cart::FieldErrors;

use crate::db::WebhookRepository;
use crate::models::webhook::{validate_events, validate_url};
use crate::models::{Webhook, WebhookUpdate};
use crate::services::ServiceError;

/// A fresh signing secret: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_secret() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

#[derive(Clone)]
pub struct WebhookSubscriptions {
    repo: Arc<dyn WebhookRepository>,
}

impl WebhookSubscriptions {
    #[must_use]
    pub fn new(repo: Arc<dyn WebhookRepository>) -> Self {
        Self { repo }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if storage fails.
    pub async fn list(&self) -> Result<Vec<Webhook>, ServiceError> {
        Ok(self.repo.list_webhooks().await?)
    }

    /// Validate and store a new active subscription with a generated secret.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a bad URL or event list.
    #[instrument(skip(self, events))]
    pub async fn create(&self, url: &str, events: &[String]) -> Result<Webhook, ServiceError> {
        let url = url.trim();
        let mut errors = FieldErrors::new();
        validate_url(url, &mut errors);
        validate_events(events, &mut errors);
        errors.into_result().map_err(ServiceError::Validation)?;

        let hook = self
            .repo
            .create_webhook(url, events, &generate_secret())
            .await?;
        info!(webhook_id = %hook.id, "Webhook subscription created");
        Ok(hook)
    }

    /// Apply a partial update; provided fields get the same checks as on create.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` or `ServiceError::NotFound`.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: WebhookId,
        mut update: WebhookUpdate,
    ) -> Result<Webhook, ServiceError> {
        let mut errors = FieldErrors::new();
        if let Some(url) = &mut update.url {
            *url = url.trim().to_string();
            validate_url(url, &mut errors);
        }
        if let Some(events) = &update.events {
            validate_events(events, &mut errors);
        }
        errors.into_result().map_err(ServiceError::Validation)?;

        let hook = self.repo.update_webhook(id, &update).await?;
        info!(webhook_id = %hook.id, active = hook.active, "Webhook subscription updated");
        Ok(hook)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: WebhookId) -> Result<(), ServiceError> {
        self.repo.delete_webhook(id).await?;
        info!(webhook_id = %id, "Webhook subscription deleted");
        Ok(())
    }

    /// Replace the secret. Signatures made with the old one stop verifying.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn regenerate_secret(&self, id: WebhookId) -> Result<Webhook, ServiceError> {
        let hook = self.repo.set_webhook_secret(id, &generate_secret()).await?;
        info!(webhook_id = %id, "Webhook secret regenerated");
        Ok(hook)
    }
}
