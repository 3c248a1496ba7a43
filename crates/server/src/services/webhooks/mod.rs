//! Webhook fan-out for order events.
//!
//! [`WebhookDispatcher::dispatch`] signs one envelope per subscriber and
//! delivers to all of them concurrently. Individual failures are logged and
//! counted; they never reach the caller.

pub mod delivery;
pub mod payload;
pub mod subscriptions;

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use whitelabel_core::webhook::{WebhookEnvelope, WebhookEvent, sign_payload};

use crate::db::WebhookRepository;
pub use delivery::{
    Deliverer, Delivery, DeliveryError, HttpDeliverer, RetryPolicy, RetryingDeliverer,
};
pub use subscriptions::{WebhookSubscriptions, generate_secret};

/// Outcome counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl DispatchSummary {
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    inner: Arc<WebhookDispatcherInner>,
}

struct WebhookDispatcherInner {
    repo: Arc<dyn WebhookRepository>,
    deliverer: Arc<dyn Deliverer>,
}

impl WebhookDispatcher {
    #[must_use]
    pub fn new(repo: Arc<dyn WebhookRepository>, deliverer: Arc<dyn Deliverer>) -> Self {
        Self {
            inner: Arc::new(WebhookDispatcherInner { repo, deliverer }),
        }
    }

    /// Deliver `event` to every active subscription that wants it.
    #[instrument(skip(self, data), fields(event = %event))]
    pub async fn dispatch(&self, event: WebhookEvent, data: serde_json::Value) -> DispatchSummary {
        let subscriptions = match self.inner.repo.list_active_webhooks().await {
            Ok(hooks) => hooks,
            Err(e) => {
                error!(error = %e, "Failed to load webhook subscriptions");
                return DispatchSummary::default();
            }
        };

        let targets: Vec<_> = subscriptions
            .into_iter()
            .filter(|hook| hook.wants(event.as_str()))
            .collect();
        if targets.is_empty() {
            return DispatchSummary::default();
        }

        let envelope = WebhookEnvelope::new(event.as_str(), data, Utc::now());
        let body = match envelope.to_body() {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize webhook envelope");
                return DispatchSummary {
                    succeeded: 0,
                    failed: targets.len(),
                };
            }
        };

        let attempts = targets.iter().map(|hook| {
            let body = body.clone();
            async move {
                let signature = sign_payload(&hook.secret, &body).map_err(|e| {
                    warn!(webhook_id = %hook.id, error = %e, "Failed to sign webhook body");
                })?;
                let delivery = Delivery {
                    url: hook.url.clone(),
                    event: event.as_str().to_string(),
                    body,
                    signature,
                };
                self.inner.deliverer.deliver(&delivery).await.map_err(|e| {
                    warn!(
                        webhook_id = %hook.id,
                        url = %hook.url,
                        error = %e,
                        "Webhook delivery failed"
                    );
                })
            }
        });

        let results = join_all(attempts).await;
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let summary = DispatchSummary {
            succeeded,
            failed: results.len() - succeeded,
        };

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Webhooks dispatched for {event}: {} success, {} failed",
            summary.succeeded,
            summary.failed
        );
        summary
    }
}
