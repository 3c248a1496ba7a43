//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error renders as `{"error": <category>, "message": <text>}`, plus a
//! `fields` map for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use whitelabel_core::ProductId;
use whitelabel_core::cart::FieldErrors;

use crate::db::RepositoryError;
use crate::services::ServiceError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderError;
use crate::services::payments::PaymentError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed field-level validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("{0}")]
    InsufficientStock(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with the current state (e.g. invalid status move).
    #[error("{0}")]
    BusinessRule(String),

    /// Missing or wrong admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Payment gateway call failed.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(PaymentError),

    /// Storage failed; `message` is what the client sees.
    #[error("Persistence failure: {source}")]
    Persistence {
        message: &'static str,
        source: RepositoryError,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl AppError {
    /// Machine-readable category sent as `error`.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::ProductNotFound(_) => "ProductNotFound",
            Self::InsufficientStock(_) => "InsufficientStock",
            Self::NotFound(_) => "NotFound",
            Self::BusinessRule(_) => "BusinessRuleViolation",
            Self::Unauthorized(_) => "Unauthorized",
            Self::BadRequest(_) => "BadRequest",
            Self::PaymentGateway(_) => "PaymentGatewayFailure",
            Self::Persistence { .. } => "PersistenceFailure",
            Self::Internal(_) => "InternalError",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InsufficientStock(_)
            | Self::BusinessRule(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ProductNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                category = self.category(),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Persistence { message, .. } => (*message).to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::PaymentGateway(_) => "Payment provider error".to_string(),
            Self::Validation(_) => "Validation failed".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) | Self::BusinessRule(msg) => {
                msg.clone()
            }
            Self::ProductNotFound(_) | Self::InsufficientStock(_) => self.to_string(),
        };

        let status = self.status();
        let body = ErrorBody {
            error: self.category(),
            message,
            fields: match self {
                Self::Validation(fields) => Some(fields),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource".to_string()),
            source => Self::Persistence {
                message: "Internal server error",
                source,
            },
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(fields) => Self::Validation(fields),
            ServiceError::NotFound => Self::NotFound("Resource".to_string()),
            ServiceError::Persistence(source) => source.into(),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(fields) => Self::Validation(fields),
            CheckoutError::ProductNotFound(id) => Self::ProductNotFound(id),
            e @ CheckoutError::InsufficientStock { .. } => Self::InsufficientStock(e.to_string()),
            CheckoutError::Persistence(source) => Self::Persistence {
                message: "Checkout failed, please try again",
                source,
            },
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => Self::NotFound("Order".to_string()),
            OrderError::InvalidTransition(e) => Self::BusinessRule(e.to_string()),
            OrderError::Conflict(msg) => Self::BusinessRule(msg),
            OrderError::Persistence(source) => source.into(),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::PaymentGateway(err)
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for an admin or checkout action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
