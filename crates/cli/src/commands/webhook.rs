//! Webhook signature tools for subscriber integrators.
//!
//! The server signs the exact request body with HMAC-SHA256 keyed by the
//! subscription secret and sends the hex digest in `X-Webhook-Signature`.

use std::path::PathBuf;

use whitelabel_core::webhook::{SIGNATURE_HEADER, SignatureError, sign_payload, verify_signature};

#[derive(Debug, thiserror::Error)]
pub enum WebhookToolError {
    #[error("Failed to read payload file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Signature(#[from] SignatureError),
}

/// Where the raw body comes from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    Inline(String),
    File(PathBuf),
}

impl PayloadSource {
    async fn read(&self) -> Result<Vec<u8>, WebhookToolError> {
        match self {
            Self::Inline(body) => Ok(body.as_bytes().to_vec()),
            Self::File(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

/// Print the signature for a payload.
pub async fn sign(secret: &str, payload: &PayloadSource) -> Result<(), WebhookToolError> {
    let body = payload.read().await?;
    let signature = sign_payload(secret, &body)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{SIGNATURE_HEADER}: {signature}");
    }
    Ok(())
}

/// Verify a received signature; fails the command on mismatch.
pub async fn verify(
    secret: &str,
    signature: &str,
    payload: &PayloadSource,
) -> Result<(), WebhookToolError> {
    let body = payload.read().await?;
    verify_signature(secret, &body, signature)?;
    tracing::info!(bytes = body.len(), "Signature is valid");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_accepts_own_signature() {
        let payload = PayloadSource::Inline(r#"{"event":"order.created"}"#.to_string());
        let signature = sign_payload("topsecret", br#"{"event":"order.created"}"#).unwrap();

        verify("topsecret", &signature, &payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_rejects_other_secret() {
        let payload = PayloadSource::Inline("{}".to_string());
        let signature = sign_payload("one", b"{}").unwrap();

        let err = verify("two", &signature, &payload).await.unwrap_err();
        assert!(matches!(
            err,
            WebhookToolError::Signature(SignatureError::Mismatch)
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let payload = PayloadSource::File(PathBuf::from("/nonexistent/payload.json"));
        let err = sign("secret", &payload).await.unwrap_err();
        assert!(matches!(err, WebhookToolError::Io(_)));
    }
}
