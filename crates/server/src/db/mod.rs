//! Database access for the shop.
//!
//! # Tables
//!
//! - `products` - Catalog, including stock on hand
//! - `orders`, `order_items`, `invoices` - Orders created at checkout
//! - `webhooks` - Outbound webhook subscriptions
//! - `store_config` - Singleton store settings
//! - `contacts` - Contact form messages
//!
//! Each concern is a repository trait with two implementations:
//! [`PgStore`] for `PostgreSQL` and [`MemoryStore`] for tests and local demos.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p whitelabel-cli -- migrate
//! ```

pub mod contacts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod store_config;
pub mod webhooks;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use whitelabel_core::ProductId;

pub use contacts::ContactRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use store_config::StoreConfigRepository;
pub use webhooks::WebhookRepository;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or concurrent modification.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A conditional stock decrement matched no row.
    #[error("insufficient stock for product {0}")]
    OutOfStock(ProductId),
}

/// Everything the application needs from storage.
pub trait Store:
    ProductRepository
    + OrderRepository
    + WebhookRepository
    + StoreConfigRepository
    + ContactRepository
    + 'static
{
}

impl<T> Store for T where
    T: ProductRepository
        + OrderRepository
        + WebhookRepository
        + StoreConfigRepository
        + ContactRepository
        + 'static
{
}

/// `PostgreSQL`-backed implementation of every repository trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
