//! Outbound webhook subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whitelabel_core::WebhookId;
use whitelabel_core::cart::FieldErrors;
use whitelabel_core::webhook::{is_subscribable, subscription_matches};

/// A subscriber endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: WebhookId,
    pub url: String,
    /// Event names, or `*` for all.
    #[sqlx(json)]
    pub events: Vec<String>,
    /// Shared HMAC secret, 64 hex characters.
    pub secret: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Webhook {
    /// Whether this subscription should receive `event`.
    #[must_use]
    pub fn wants(&self, event: &str) -> bool {
        self.active && subscription_matches(&self.events, event)
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookUpdate {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Check a target URL, recording problems under `url`.
pub fn validate_url(url: &str, errors: &mut FieldErrors) {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
        Ok(_) => errors.add("url", "URL must use http or https"),
        Err(_) => errors.add("url", "URL must be absolute"),
    }
}

/// Check an event list, recording problems under `events`.
pub fn validate_events(events: &[String], errors: &mut FieldErrors) {
    if events.is_empty() {
        errors.add("events", "Select at least one event");
    }
    for event in events {
        if !is_subscribable(event) {
            errors.add("events", format!("Unknown event: {event}"));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hook(events: &[&str], active: bool) -> Webhook {
        Webhook {
            id: WebhookId::new(),
            url: "https://hooks.example.com/orders".to_string(),
            events: events.iter().map(ToString::to_string).collect(),
            secret: "00".repeat(32),
            active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_wants() {
        assert!(hook(&["order.created"], true).wants("order.created"));
        assert!(hook(&["*"], true).wants("order.updated"));
        assert!(!hook(&["order.updated"], true).wants("order.created"));
        assert!(!hook(&["*"], false).wants("order.created"));
    }

    #[test]
    fn test_validation() {
        let mut errors = FieldErrors::new();
        validate_url("https://hooks.example.com/x", &mut errors);
        validate_events(&["order.created".to_string(), "*".to_string()], &mut errors);
        assert!(errors.is_empty());

        validate_url("/relative", &mut errors);
        validate_url("mailto:ops@example.com", &mut errors);
        validate_events(&["order.shipped".to_string()], &mut errors);
        validate_events(&[], &mut errors);
        assert_eq!(errors.get("url").unwrap().len(), 2);
        assert_eq!(errors.get("events").unwrap().len(), 2);
    }

    #[test]
    fn test_update_fields_are_optional() {
        let update: WebhookUpdate = serde_json::from_str(r#"{"active":false}"#).unwrap();
        assert_eq!(update.active, Some(false));
        assert!(update.url.is_none());
        assert!(update.events.is_none());
    }
}
