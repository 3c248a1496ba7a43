//! Payment gateway integration.
//!
//! With Stripe configured, checkout hands the cart to a hosted Checkout
//! Session and the order is created only when Stripe calls back with
//! `checkout.session.completed`. The cart travels in the session metadata.

pub mod stripe;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::services::checkout::{CheckoutItem, CheckoutRequest, CustomerDetails};

pub use stripe::{StripeClient, StripeEvent};

#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response or callback.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("session response has no redirect URL")]
    MissingSessionUrl,

    #[error("invalid callback signature")]
    InvalidSignature,

    #[error("callback timestamp outside tolerance")]
    StaleSignature,
}

impl PaymentError {
    /// Errors caused by the caller rather than the gateway.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::StaleSignature | Self::Parse(_)
        )
    }
}

/// Session metadata carrying the cart: `customerEmail`, `items` and `total`.
///
/// # Errors
///
/// Returns `PaymentError::Parse` if the items cannot be serialized.
pub fn checkout_metadata(request: &CheckoutRequest) -> Result<Vec<(String, String)>, PaymentError> {
    let items =
        serde_json::to_string(&request.items).map_err(|e| PaymentError::Parse(e.to_string()))?;

    let mut metadata = Vec::with_capacity(3);
    if let Some(customer) = &request.customer {
        metadata.push(("customerEmail".to_string(), customer.email.clone()));
    }
    metadata.push(("items".to_string(), items));
    metadata.push(("total".to_string(), request.total.to_string()));
    Ok(metadata)
}

/// Rebuild the checkout request from a completed session object.
///
/// # Errors
///
/// Returns `PaymentError::Parse` when the metadata is missing or unreadable.
pub fn checkout_from_session(session: &serde_json::Value) -> Result<CheckoutRequest, PaymentError> {
    let metadata = session
        .get("metadata")
        .ok_or_else(|| PaymentError::Parse("session has no metadata".to_string()))?;
    let field = |key: &str| metadata.get(key).and_then(serde_json::Value::as_str);

    let items: Vec<CheckoutItem> = field("items")
        .ok_or_else(|| PaymentError::Parse("metadata.items missing".to_string()))
        .and_then(|raw| serde_json::from_str(raw).map_err(|e| PaymentError::Parse(e.to_string())))?;

    let total: Decimal = field("total")
        .ok_or_else(|| PaymentError::Parse("metadata.total missing".to_string()))?
        .parse()
        .map_err(|e: rust_decimal::Error| PaymentError::Parse(e.to_string()))?;

    let customer = field("customerEmail")
        .filter(|email| !email.is_empty())
        .map(|email| CustomerDetails {
            email: email.to_string(),
            name: session
                .pointer("/customer_details/name")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
        });

    Ok(CheckoutRequest {
        items,
        customer,
        total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;
    use whitelabel_core::ProductId;

    use super::*;

    #[test]
    fn test_metadata_survives_the_gateway() {
        let request = CheckoutRequest {
            items: vec![CheckoutItem {
                product_id: ProductId::new(),
                name: Some("Mug".to_string()),
                price: Decimal::from_str("9.99").unwrap(),
                quantity: 2,
                image: None,
            }],
            customer: Some(CustomerDetails {
                email: "buyer@example.com".to_string(),
                name: None,
            }),
            total: Decimal::from_str("19.98").unwrap(),
        };

        let metadata: serde_json::Map<String, serde_json::Value> = checkout_metadata(&request)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        let session = json!({
            "metadata": metadata,
            "customer_details": {"name": "Ada"}
        });

        let restored = checkout_from_session(&session).unwrap();
        assert_eq!(restored.total, request.total);
        assert_eq!(restored.items[0].product_id, request.items[0].product_id);
        assert_eq!(restored.items[0].quantity, 2);
        let customer = restored.customer.unwrap();
        assert_eq!(customer.email, "buyer@example.com");
        assert_eq!(customer.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_missing_metadata_is_parse_error() {
        let err = checkout_from_session(&json!({"id": "cs_1"})).unwrap_err();
        assert!(matches!(err, PaymentError::Parse(_)));
        assert!(err.is_client_error());
    }
}
