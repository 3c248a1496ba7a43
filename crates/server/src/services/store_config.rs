//! Read-through cache for the store configuration singleton.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::db::StoreConfigRepository;
use crate::models::{StoreConfig, StoreConfigUpdate};
use crate::services::ServiceError;

/// Store configuration with a bounded-age in-process copy.
///
/// Writes through this cache refresh it immediately. Other processes see a
/// change only once their copy expires.
///
/// Every write bumps a generation counter. A load only fills the cache if no
/// write happened while it was reading, so a slow read never replaces a
/// fresher value.
#[derive(Clone)]
pub struct StoreConfigCache {
    repo: Arc<dyn StoreConfigRepository>,
    cache: Cache<(), StoreConfig>,
    generation: Arc<Mutex<u64>>,
}

impl StoreConfigCache {
    #[must_use]
    pub fn new(repo: Arc<dyn StoreConfigRepository>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self {
            repo,
            cache,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    /// The cached configuration, loading (and creating) it when stale.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if the load fails.
    pub async fn get(&self) -> Result<StoreConfig, ServiceError> {
        if let Some(config) = self.cache.get(&()).await {
            debug!("Cache hit for store config");
            return Ok(config);
        }

        let started = *self.generation.lock().await;
        let config = self.repo.load_or_create_config().await?;

        let generation = self.generation.lock().await;
        if *generation == started {
            self.cache.insert((), config.clone()).await;
        } else {
            debug!("Store config changed during load, not caching");
        }
        Ok(config)
    }

    /// Validate, persist and cache a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` with field messages, or
    /// `ServiceError::Persistence` if the write fails.
    #[instrument(skip(self, update))]
    pub async fn update(&self, update: StoreConfigUpdate) -> Result<StoreConfig, ServiceError> {
        let update = update.validated().map_err(ServiceError::Validation)?;
        let config = self.repo.update_config(&update).await?;
        {
            let mut generation = self.generation.lock().await;
            *generation = generation.wrapping_add(1);
            self.cache.insert((), config.clone()).await;
        }
        info!(store_name = %config.store_name, "Store configuration updated");
        Ok(config)
    }

    /// Drop the cached copy; the next [`get`](Self::get) reloads.
    pub async fn invalidate(&self) {
        let mut generation = self.generation.lock().await;
        *generation = generation.wrapping_add(1);
        self.cache.invalidate(&()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::db::{MemoryStore, RepositoryError};

    /// Holds every load until released, so a write can land mid-read.
    struct GatedLoads {
        inner: Arc<MemoryStore>,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl StoreConfigRepository for GatedLoads {
        async fn load_or_create_config(&self) -> Result<StoreConfig, RepositoryError> {
            let config = self.inner.load_or_create_config().await?;
            self.entered.notify_one();
            self.release.notified().await;
            Ok(config)
        }

        async fn update_config(
            &self,
            update: &StoreConfigUpdate,
        ) -> Result<StoreConfig, RepositoryError> {
            self.inner.update_config(update).await
        }
    }

    fn cache(ttl: Duration) -> (Arc<MemoryStore>, StoreConfigCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = StoreConfigCache::new(store.clone(), ttl);
        (store, cache)
    }

    #[tokio::test]
    async fn test_loads_once_within_ttl() {
        let (store, cache) = cache(Duration::from_secs(60));
        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.config_loads(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let (store, cache) = cache(Duration::from_secs(60));
        cache.get().await.unwrap();
        cache.invalidate().await;
        cache.get().await.unwrap();
        assert_eq!(store.config_loads(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_reloads() {
        let (store, cache) = cache(Duration::from_millis(20));
        cache.get().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.get().await.unwrap();
        assert_eq!(store.config_loads(), 2);
    }

    #[tokio::test]
    async fn test_update_visible_immediately() {
        let (store, cache) = cache(Duration::from_secs(60));
        cache.get().await.unwrap();

        let update = StoreConfigUpdate {
            store_name: Some("Corner Shop".to_string()),
            ..StoreConfigUpdate::default()
        };
        cache.update(update).await.unwrap();

        assert_eq!(cache.get().await.unwrap().store_name, "Corner Shop");
        assert_eq!(store.config_loads(), 1);
    }

    #[tokio::test]
    async fn test_load_overlapping_update_does_not_cache_old_value() {
        let store = Arc::new(MemoryStore::new());
        store.load_or_create_config().await.unwrap();
        let repo = Arc::new(GatedLoads {
            inner: store,
            entered: Notify::new(),
            release: Notify::new(),
        });
        let cache = StoreConfigCache::new(repo.clone(), Duration::from_secs(60));

        let reader = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get().await.unwrap() }
        });
        repo.entered.notified().await;

        let update = StoreConfigUpdate {
            store_name: Some("Corner Shop".to_string()),
            ..StoreConfigUpdate::default()
        };
        cache.update(update).await.unwrap();
        repo.release.notify_one();

        let stale = reader.await.unwrap();
        assert_eq!(stale.store_name, "My Shop");
        assert_eq!(cache.get().await.unwrap().store_name, "Corner Shop");
    }

    #[tokio::test]
    async fn test_invalid_update_rejected() {
        let (_store, cache) = cache(Duration::from_secs(60));
        let update = StoreConfigUpdate {
            primary_color: Some("red".to_string()),
            ..StoreConfigUpdate::default()
        };
        let err = cache.update(update).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(cache.get().await.unwrap().primary_color, "#6366f1");
    }
}
