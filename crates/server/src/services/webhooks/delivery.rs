//! Outbound delivery of signed webhook bodies.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, warn};
use whitelabel_core::webhook::{EVENT_HEADER, SIGNATURE_HEADER};

/// One signed request to one subscriber.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub url: String,
    pub event: String,
    pub body: Vec<u8>,
    pub signature: String,
}

/// Why a single delivery failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The subscriber answered with a non-2xx status.
    #[error("subscriber responded with HTTP {0}")]
    Status(u16),
}

impl DeliveryError {
    /// Transport failures and server errors may succeed later; other
    /// statuses will not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(status) => *status >= 500 || *status == 408 || *status == 429,
        }
    }
}

/// Sends a prepared [`Delivery`].
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError>;
}

/// Single-attempt HTTP POST with a bounded timeout.
#[derive(Clone)]
pub struct HttpDeliverer {
    client: reqwest::Client,
}

impl HttpDeliverer {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Deliverer for HttpDeliverer {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&delivery.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, &delivery.signature)
            .header(EVENT_HEADER, &delivery.event)
            .body(delivery.body.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        debug!(url = %delivery.url, status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 250,
        }
    }
}

/// Retries retryable failures of an inner [`Deliverer`] with linear backoff.
pub struct RetryingDeliverer<D> {
    inner: D,
    retry: RetryPolicy,
}

impl<D: Deliverer> RetryingDeliverer<D> {
    #[must_use]
    pub const fn new(inner: D, retry: RetryPolicy) -> Self {
        Self { inner, retry }
    }
}

#[async_trait]
impl<D: Deliverer> Deliverer for RetryingDeliverer<D> {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.inner.deliver(delivery).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let exhausted =
                        usize::try_from(attempt).map_or(true, |a| a >= self.retry.max_attempts);
                    if exhausted || !err.is_retryable() {
                        return Err(err);
                    }
                    warn!(
                        url = %delivery.url,
                        attempt,
                        error = %err,
                        "Webhook delivery failed, retrying"
                    );
                }
            }
            tokio::time::sleep(Duration::from_millis(
                self.retry.base_backoff_ms.saturating_mul(attempt),
            ))
            .await;
        }
    }
}
