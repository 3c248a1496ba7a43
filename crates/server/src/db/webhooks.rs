//! Webhook subscription repository.

use async_trait::async_trait;
use sqlx::types::Json;
use whitelabel_core::WebhookId;

use super::{PgStore, RepositoryError};
use crate::models::{Webhook, WebhookUpdate};

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// All subscriptions, newest first.
    async fn list_webhooks(&self) -> Result<Vec<Webhook>, RepositoryError>;

    async fn list_active_webhooks(&self) -> Result<Vec<Webhook>, RepositoryError>;

    async fn create_webhook(
        &self,
        url: &str,
        events: &[String],
        secret: &str,
    ) -> Result<Webhook, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn update_webhook(
        &self,
        id: WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Webhook, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn set_webhook_secret(
        &self,
        id: WebhookId,
        secret: &str,
    ) -> Result<Webhook, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn delete_webhook(&self, id: WebhookId) -> Result<(), RepositoryError>;
}

const WEBHOOK_COLUMNS: &str = "id, url, events, secret, active, created_at";

#[async_trait]
impl WebhookRepository for PgStore {
    async fn list_webhooks(&self) -> Result<Vec<Webhook>, RepositoryError> {
        let hooks = sqlx::query_as::<_, Webhook>(&format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(hooks)
    }

    async fn list_active_webhooks(&self) -> Result<Vec<Webhook>, RepositoryError> {
        let hooks = sqlx::query_as::<_, Webhook>(&format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE active ORDER BY created_at"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(hooks)
    }

    async fn create_webhook(
        &self,
        url: &str,
        events: &[String],
        secret: &str,
    ) -> Result<Webhook, RepositoryError> {
        let hook = sqlx::query_as::<_, Webhook>(&format!(
            r"
            INSERT INTO webhooks (id, url, events, secret, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {WEBHOOK_COLUMNS}
            "
        ))
        .bind(WebhookId::new())
        .bind(url)
        .bind(Json(events))
        .bind(secret)
        .fetch_one(self.pool())
        .await?;

        Ok(hook)
    }

    async fn update_webhook(
        &self,
        id: WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Webhook, RepositoryError> {
        sqlx::query_as::<_, Webhook>(&format!(
            r"
            UPDATE webhooks
            SET url = COALESCE($2, url),
                events = COALESCE($3, events),
                active = COALESCE($4, active)
            WHERE id = $1
            RETURNING {WEBHOOK_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.url.as_deref())
        .bind(update.events.as_ref().map(Json))
        .bind(update.active)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn set_webhook_secret(
        &self,
        id: WebhookId,
        secret: &str,
    ) -> Result<Webhook, RepositoryError> {
        sqlx::query_as::<_, Webhook>(&format!(
            "UPDATE webhooks SET secret = $2 WHERE id = $1 RETURNING {WEBHOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(secret)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn delete_webhook(&self, id: WebhookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
