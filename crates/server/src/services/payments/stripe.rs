//! Stripe Checkout over the REST API.
//!
//! Only two calls are needed: creating a hosted Checkout Session and
//! verifying the signed callback Stripe sends when payment completes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use whitelabel_core::webhook::verify_signature;
use whitelabel_core::{CurrencyCode, Price};

use super::PaymentError;
use crate::config::StripeConfig;
use crate::services::checkout::CheckoutItem;

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum accepted age of a signed callback.
pub const SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);

/// Callback event type that triggers order creation.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// One line of a hosted checkout page.
#[derive(Debug, Clone)]
pub struct SessionLine {
    pub name: String,
    pub unit_price: Price,
    pub quantity: i32,
    pub image: Option<String>,
}

impl SessionLine {
    /// Build a session line from a checkout item, using `fallback_name`
    /// when the client sent no display name.
    #[must_use]
    pub fn from_item(item: &CheckoutItem, fallback_name: &str, currency: CurrencyCode) -> Self {
        Self {
            name: item
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| fallback_name.to_string()),
            unit_price: Price::new(item.price, currency),
            quantity: item.quantity,
            image: item.image.clone(),
        }
    }
}

/// Parameters for a new Checkout Session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub lines: Vec<SessionLine>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// A verified callback event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: SecretString,
    webhook_secret: SecretString,
    api_base: String,
}

impl StripeClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a hosted Checkout Session and return its redirect URL.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the request fails or Stripe rejects it.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<String, PaymentError> {
        let form = session_form(request)?;

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;
        debug!(session_id = %session.id, "Checkout session created");

        session.url.ok_or(PaymentError::MissingSessionUrl)
    }

    /// Verify a callback body against its `Stripe-Signature` header.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` when no `v1` signature
    /// matches, `PaymentError::StaleSignature` when the timestamp is outside
    /// the tolerance, and `PaymentError::Parse` for an unreadable body.
    pub fn verify_event(
        &self,
        body: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<StripeEvent, PaymentError> {
        verify_callback(self.webhook_secret.expose_secret(), body, header, now)?;
        serde_json::from_slice(body).map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

/// Check a `t=<ts>,v1=<hex>[,v1=<hex>...]` header against `body`.
///
/// # Errors
///
/// See [`StripeClient::verify_event`].
pub fn verify_callback(
    secret: &str,
    body: &[u8],
    header: &str,
    now: DateTime<Utc>,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature);
    }

    let age = now.timestamp().abs_diff(timestamp);
    if age > SIGNATURE_TOLERANCE.as_secs() {
        return Err(PaymentError::StaleSignature);
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(body);

    if signatures
        .iter()
        .any(|sig| verify_signature(secret, &signed, sig).is_ok())
    {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature)
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
fn session_form(request: &SessionRequest) -> Result<Vec<(String, String)>, PaymentError> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        let cents = line
            .unit_price
            .minor_units()
            .ok_or_else(|| PaymentError::Parse(format!("price out of range: {}", line.unit_price)))?;

        form.push((
            format!("{prefix}[price_data][currency]"),
            line.unit_price.currency_code.code().to_lowercase(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        if let Some(image) = &line.image {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((format!("{prefix}[price_data][unit_amount]"), cents.to_string()));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    Ok(form)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use whitelabel_core::webhook::sign_payload;

    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn header_for(body: &[u8], ts: i64) -> String {
        let mut signed = format!("{ts}.").into_bytes();
        signed.extend_from_slice(body);
        format!("t={ts},v1={}", sign_payload(SECRET, &signed).unwrap())
    }

    #[test]
    fn test_valid_callback_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        verify_callback(SECRET, body, &header_for(body, 1_700_000_000), now).unwrap();
    }

    #[test]
    fn test_tampered_body_rejected() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = header_for(b"original", 1_700_000_000);
        assert!(matches!(
            verify_callback(SECRET, b"tampered", &header, now),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"{}";
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = header_for(body, 1_700_000_000 - 301);
        assert!(matches!(
            verify_callback(SECRET, body, &header, now),
            Err(PaymentError::StaleSignature)
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let now = Utc::now();
        assert!(verify_callback(SECRET, b"{}", "v1=abcd", now).is_err());
        assert!(verify_callback(SECRET, b"{}", "t=1", now).is_err());
    }

    #[test]
    fn test_session_form_uses_cents() {
        let request = SessionRequest {
            lines: vec![SessionLine {
                name: "Mug".to_string(),
                unit_price: Price::new(Decimal::from_str("9.99").unwrap(), CurrencyCode::EUR),
                quantity: 2,
                image: Some("https://cdn.example.com/mug.png".to_string()),
            }],
            success_url: "https://shop.example.com/checkout/success".to_string(),
            cancel_url: "https://shop.example.com/checkout".to_string(),
            metadata: vec![("total".to_string(), "19.98".to_string())],
        };

        let form = session_form(&request).unwrap();
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("line_items[0][price_data][unit_amount]"), "999");
        assert_eq!(get("line_items[0][price_data][currency]"), "eur");
        assert_eq!(get("line_items[0][quantity]"), "2");
        assert_eq!(get("metadata[total]"), "19.98");
        assert_eq!(get("mode"), "payment");
    }
}
