//! Business logic services.
//!
//! # Services
//!
//! - `checkout` - Cart validation, stock checks and order creation
//! - `contacts` - Contact form submissions and the admin inbox
//! - `orders` - Status lifecycle, cascade delete and the cached admin listing
//! - `store_config` - Read-through store configuration cache
//! - `payments` - Stripe Checkout sessions and callback verification
//! - `webhooks` - Subscription management and signed fan-out delivery

pub mod checkout;
pub mod contacts;
pub mod orders;
pub mod payments;
pub mod store_config;
pub mod webhooks;

use thiserror::Error;
use whitelabel_core::cart::FieldErrors;

use crate::db::RepositoryError;

/// Error shared by the simpler CRUD-style services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("not found")]
    NotFound,

    #[error("persistence failure: {0}")]
    Persistence(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Persistence(other),
        }
    }
}
