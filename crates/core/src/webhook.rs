//! Outbound webhook primitives: event names, the delivery envelope and
//! HMAC-SHA256 payload signatures.
//!
//! Receivers verify a delivery by recomputing
//! `hex(HMAC-SHA256(secret, raw_body))` and comparing it to the
//! `X-Webhook-Signature` header.

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Header carrying the hex signature of the request body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
/// Header carrying the event name.
pub const EVENT_HEADER: &str = "X-Webhook-Event";
/// Subscription entry matching every event.
pub const WILDCARD: &str = "*";

/// Events the shop emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.updated")]
    OrderUpdated,
}

impl WebhookEvent {
    pub const ALL: [Self; 2] = [Self::OrderCreated, Self::OrderUpdated];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order.created",
            Self::OrderUpdated => "order.updated",
        }
    }
}

impl std::fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WebhookEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown webhook event: {s}"))
    }
}

/// Whether `name` may appear in a subscription's event list.
#[must_use]
pub fn is_subscribable(name: &str) -> bool {
    name == WILDCARD || name.parse::<WebhookEvent>().is_ok()
}

/// Whether a subscription listening to `subscribed` should receive `event`.
#[must_use]
pub fn subscription_matches<S: AsRef<str>>(subscribed: &[S], event: &str) -> bool {
    subscribed
        .iter()
        .any(|name| name.as_ref() == event || name.as_ref() == WILDCARD)
}

/// The JSON body POSTed to subscribers.
///
/// Field order is part of the wire format: `event`, `data`, `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    pub data: serde_json::Value,
    /// ISO-8601 UTC with millisecond precision, e.g. `2026-01-05T10:00:00.000Z`.
    pub timestamp: String,
}

impl WebhookEnvelope {
    #[must_use]
    pub fn new(event: &str, data: serde_json::Value, at: DateTime<Utc>) -> Self {
        Self {
            event: event.to_owned(),
            data,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Serialize to the exact bytes that get signed and sent.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` contains values JSON cannot represent.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Signing or verification failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("signature is not valid hex")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

fn keyed_mac(secret: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(mac)
}

/// Compute the lower-case hex HMAC-SHA256 of `body` keyed by `secret`.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKey`] if the MAC rejects the key.
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mac = keyed_mac(secret, body)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature against `body` in constant time.
///
/// # Errors
///
/// Returns [`SignatureError::Malformed`] for non-hex input and
/// [`SignatureError::Mismatch`] when the signature does not match.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    signature_hex: &str,
) -> Result<(), SignatureError> {
    let signature = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::Malformed)?;
    keyed_mac(secret, body)?
        .verify_slice(&signature)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(WebhookEvent::OrderCreated.as_str(), "order.created");
        assert_eq!(
            "order.updated".parse::<WebhookEvent>().unwrap(),
            WebhookEvent::OrderUpdated
        );
        assert!("order.deleted".parse::<WebhookEvent>().is_err());
        assert!(is_subscribable("*"));
        assert!(!is_subscribable("order.*"));
    }

    #[test]
    fn test_subscription_matching() {
        assert!(subscription_matches(&["order.created"], "order.created"));
        assert!(subscription_matches(&["*"], "order.updated"));
        assert!(!subscription_matches(&["order.updated"], "order.created"));
        assert!(!subscription_matches::<&str>(&[], "order.created"));
    }

    #[test]
    fn test_envelope_wire_format() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let envelope = WebhookEnvelope::new("order.created", json!({"orderId": "abc"}), at);
        let body = String::from_utf8(envelope.to_body().unwrap()).unwrap();
        assert_eq!(
            body,
            r#"{"event":"order.created","data":{"orderId":"abc"},"timestamp":"2026-01-05T10:00:00.000Z"}"#
        );
    }

    #[test]
    fn test_sign_matches_reference_hmac() {
        let mut mac = HmacSha256::new_from_slice(b"key").expect("valid key length");
        mac.update(b"The quick brown fox jumps over the lazy dog");
        let expected = hex::encode(mac.finalize().into_bytes());

        let signature =
            sign_payload("key", b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(signature, expected);
        assert_eq!(
            signature,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_verify_signature() {
        let body = br#"{"event":"order.created"}"#;
        let signature = sign_payload("whsec", body).unwrap();

        assert!(verify_signature("whsec", body, &signature).is_ok());
        assert_eq!(
            verify_signature("other", body, &signature),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature("whsec", b"tampered", &signature),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature("whsec", body, "not-hex"),
            Err(SignatureError::Malformed)
        );
    }
}
