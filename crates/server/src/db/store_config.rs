//! Store configuration repository (singleton row).

use async_trait::async_trait;

use super::{PgStore, RepositoryError};
use crate::models::{StoreConfig, StoreConfigUpdate};

#[async_trait]
pub trait StoreConfigRepository: Send + Sync {
    /// Read the singleton, creating it with defaults when absent.
    async fn load_or_create_config(&self) -> Result<StoreConfig, RepositoryError>;

    /// Apply a validated partial update and return the stored record.
    async fn update_config(&self, update: &StoreConfigUpdate)
    -> Result<StoreConfig, RepositoryError>;
}

const CONFIG_COLUMNS: &str =
    "id, store_name, store_description, logo_url, primary_color, currency, updated_at";

#[async_trait]
impl StoreConfigRepository for PgStore {
    async fn load_or_create_config(&self) -> Result<StoreConfig, RepositoryError> {
        let defaults = StoreConfig::with_defaults();

        // Concurrent first reads race on the unique singleton column; the
        // loser's insert is a no-op.
        sqlx::query(
            r"
            INSERT INTO store_config
                (id, store_name, store_description, logo_url, primary_color, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (singleton) DO NOTHING
            ",
        )
        .bind(defaults.id)
        .bind(&defaults.store_name)
        .bind(defaults.store_description.as_deref())
        .bind(defaults.logo_url.as_deref())
        .bind(&defaults.primary_color)
        .bind(&defaults.currency)
        .execute(self.pool())
        .await?;

        let config = sqlx::query_as::<_, StoreConfig>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM store_config LIMIT 1"
        ))
        .fetch_one(self.pool())
        .await?;

        Ok(config)
    }

    async fn update_config(
        &self,
        update: &StoreConfigUpdate,
    ) -> Result<StoreConfig, RepositoryError> {
        let current = self.load_or_create_config().await?;

        // Nullable columns take the new value only when the key was present.
        let config = sqlx::query_as::<_, StoreConfig>(&format!(
            r"
            UPDATE store_config
            SET store_name = COALESCE($2, store_name),
                store_description = CASE WHEN $3 THEN $4 ELSE store_description END,
                logo_url = CASE WHEN $5 THEN $6 ELSE logo_url END,
                primary_color = COALESCE($7, primary_color),
                currency = COALESCE($8, currency),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CONFIG_COLUMNS}
            "
        ))
        .bind(current.id)
        .bind(update.store_name.as_deref())
        .bind(update.store_description.is_some())
        .bind(update.store_description.clone().flatten())
        .bind(update.logo_url.is_some())
        .bind(update.logo_url.clone().flatten())
        .bind(update.primary_color.as_deref())
        .bind(update.currency.as_deref())
        .fetch_one(self.pool())
        .await?;

        Ok(config)
    }
}
