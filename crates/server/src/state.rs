//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::{PgStore, ProductRepository, Store};
use crate::services::checkout::CheckoutService;
use crate::services::contacts::ContactInbox;
use crate::services::orders::{OrderListingCache, OrderService};
use crate::services::payments::{PaymentError, StripeClient};
use crate::services::store_config::StoreConfigCache;
use crate::services::webhooks::{
    Deliverer, DeliveryError, HttpDeliverer, RetryPolicy, RetryingDeliverer, WebhookDispatcher,
    WebhookSubscriptions,
};

/// How long the admin order listing stays cached without a change.
const ORDER_LISTING_TTL: Duration = Duration::from_secs(60);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("webhook client: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("stripe client: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Services and caches live here
/// rather than in globals, so each state (and each test) owns its own.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: Option<PgPool>,
    products: Arc<dyn ProductRepository>,
    checkout: CheckoutService,
    orders: OrderService,
    webhooks: WebhookSubscriptions,
    dispatcher: WebhookDispatcher,
    store_config: StoreConfigCache,
    contacts: ContactInbox,
    stripe: Option<StripeClient>,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self::with_store(config, store, Some(pool))
    }

    /// State over any storage, with the delivery stack from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn with_store<S: Store>(
        config: ServerConfig,
        store: Arc<S>,
        pool: Option<PgPool>,
    ) -> Result<Self, StateError> {
        let deliverer = build_deliverer(&config)?;
        Self::from_parts(config, store, pool, deliverer)
    }

    /// State with an explicit webhook deliverer.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe client cannot be built.
    pub fn from_parts<S: Store>(
        config: ServerConfig,
        store: Arc<S>,
        pool: Option<PgPool>,
        deliverer: Arc<dyn Deliverer>,
    ) -> Result<Self, StateError> {
        let stripe = config.stripe.as_ref().map(StripeClient::new).transpose()?;

        let dispatcher = WebhookDispatcher::new(store.clone(), deliverer);
        let listing = OrderListingCache::new(ORDER_LISTING_TTL);
        let checkout = CheckoutService::new(
            store.clone(),
            store.clone(),
            dispatcher.clone(),
            listing.clone(),
        );
        let orders = OrderService::new(store.clone(), dispatcher.clone(), listing);
        let webhooks = WebhookSubscriptions::new(store.clone());
        let store_config = StoreConfigCache::new(store.clone(), config.store_config_ttl);
        let contacts = ContactInbox::new(store.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                products: store,
                checkout,
                orders,
                webhooks,
                dispatcher,
                store_config,
                contacts,
                stripe,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Database pool, absent for in-memory state.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductRepository {
        self.inner.products.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn webhooks(&self) -> &WebhookSubscriptions {
        &self.inner.webhooks
    }

    #[must_use]
    pub fn dispatcher(&self) -> &WebhookDispatcher {
        &self.inner.dispatcher
    }

    #[must_use]
    pub fn store_config(&self) -> &StoreConfigCache {
        &self.inner.store_config
    }

    #[must_use]
    pub fn contacts(&self) -> &ContactInbox {
        &self.inner.contacts
    }

    /// Stripe client when payments are configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }
}

/// Single-attempt HTTP delivery, wrapped in retries when more than one
/// attempt is configured.
fn build_deliverer(config: &ServerConfig) -> Result<Arc<dyn Deliverer>, DeliveryError> {
    let http = HttpDeliverer::new(config.webhooks.timeout)?;
    if config.webhooks.max_attempts <= 1 {
        return Ok(Arc::new(http));
    }

    let retry = RetryPolicy {
        max_attempts: config.webhooks.max_attempts,
        base_backoff_ms: u64::try_from(config.webhooks.backoff.as_millis()).unwrap_or(u64::MAX),
    };
    Ok(Arc::new(RetryingDeliverer::new(http, retry)))
}
