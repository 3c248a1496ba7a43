//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SERVER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BASE_URL` - Public URL of the storefront, used for payment redirects
//!
//! ## Optional
//! - `SERVER_HOST` - Bind address (default: 127.0.0.1)
//! - `SERVER_PORT` - Listen port (default: 3000)
//! - `ADMIN_API_TOKEN` - Bearer token guarding `/admin/api` (high entropy)
//! - `STRIPE_SECRET_KEY` / `STRIPE_WEBHOOK_SECRET` - Enable Stripe Checkout (both or neither)
//! - `WEBHOOK_TIMEOUT_SECS` - Per-delivery timeout (default: 10)
//! - `WEBHOOK_MAX_ATTEMPTS` - Delivery attempts per subscriber (default: 1)
//! - `WEBHOOK_RETRY_BACKOFF_MS` - Linear backoff step between attempts (default: 250)
//! - `STORE_CONFIG_TTL_SECS` - Store configuration cache lifetime (default: 60)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Bearer token for the admin API; `None` leaves it open (development only)
    pub admin_token: Option<SecretString>,
    /// Stripe Checkout, when configured
    pub stripe: Option<StripeConfig>,
    /// Outbound webhook delivery tuning
    pub webhooks: WebhookDeliveryConfig,
    /// How long the store configuration stays cached
    pub store_config_ttl: Duration,
    /// Emit JSON logs
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// API base, overridable for tests
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Outbound webhook delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookDeliveryConfig {
    pub timeout: Duration,
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl Default for WebhookDeliveryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_source(&EnvSource(lookup))
    }

    fn from_source<F>(env: &EnvSource<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = env
            .optional("SERVER_DATABASE_URL")
            // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("SERVER_DATABASE_URL".to_string()))?;

        let host = env.parsed("SERVER_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parsed("SERVER_PORT", 3000_u16)?;

        let base_url = env.required("BASE_URL")?;
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BASE_URL".to_string(), e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let admin_token = match env.optional("ADMIN_API_TOKEN") {
            Some(token) => {
                validate_admin_token(&token, "ADMIN_API_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };

        let stripe = StripeConfig::from_source(env)?;

        let max_attempts = env.parsed("WEBHOOK_MAX_ATTEMPTS", 1_usize)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "WEBHOOK_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let webhooks = WebhookDeliveryConfig {
            timeout: Duration::from_secs(env.parsed("WEBHOOK_TIMEOUT_SECS", 10_u64)?),
            max_attempts,
            backoff: Duration::from_millis(env.parsed("WEBHOOK_RETRY_BACKOFF_MS", 250_u64)?),
        };

        let store_config_ttl = Duration::from_secs(env.parsed("STORE_CONFIG_TTL_SECS", 60_u64)?);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            admin_token,
            stripe,
            webhooks,
            store_config_ttl,
            json_logs: env
                .optional("LOG_FORMAT")
                .is_some_and(|v| v.eq_ignore_ascii_case("json")),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parsed("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            sentry_traces_sample_rate: env.parsed("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StripeConfig {
    const DEFAULT_API_BASE: &'static str = "https://api.stripe.com";

    fn from_source<F>(env: &EnvSource<F>) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match (
            env.optional("STRIPE_SECRET_KEY"),
            env.optional("STRIPE_WEBHOOK_SECRET"),
        ) {
            (None, None) => Ok(None),
            (Some(secret_key), Some(webhook_secret)) => {
                validate_secret_strength(&secret_key, "STRIPE_SECRET_KEY")?;
                validate_secret_strength(&webhook_secret, "STRIPE_WEBHOOK_SECRET")?;
                Ok(Some(Self {
                    secret_key: SecretString::from(secret_key),
                    webhook_secret: SecretString::from(webhook_secret),
                    api_base: env.or_default("STRIPE_API_BASE", Self::DEFAULT_API_BASE),
                }))
            }
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "STRIPE_WEBHOOK_SECRET".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("STRIPE_SECRET_KEY".to_string())),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup; blank values count as unset.
struct EnvSource<F>(F);

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Validate the admin bearer token: long enough and not a placeholder.
fn validate_admin_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    if token.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                token.len()
            ),
        ));
    }
    validate_secret_strength(token, var_name)
}

/// Whether a presented admin token matches the configured one.
#[must_use]
pub fn admin_token_matches(expected: &SecretString, presented: &str) -> bool {
    let expected = expected.expose_secret().as_bytes();
    let presented = presented.as_bytes();
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_source(&EnvSource(move |key: &str| map.get(key).cloned()))
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("BASE_URL", "http://localhost:3000/"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&minimal()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.admin_token.is_none());
        assert!(config.stripe.is_none());
        assert_eq!(config.webhooks, WebhookDeliveryConfig::default());
        assert_eq!(config.store_config_ttl, Duration::from_secs(60));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[("BASE_URL", "http://localhost:3000")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SERVER_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = minimal();
        vars.push(("SERVER_PORT", "not-a-port"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(_, _)
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut vars = minimal();
        vars.push(("WEBHOOK_MAX_ATTEMPTS", "0"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_stripe_requires_both_keys() {
        let mut vars = minimal();
        vars.push(("STRIPE_SECRET_KEY", STRONG));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::MissingEnvVar(ref key) if key == "STRIPE_WEBHOOK_SECRET"
        ));

        vars.push(("STRIPE_WEBHOOK_SECRET", "Zq8#Lw2!Rt6@Yp0$Mn4%"));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.stripe.unwrap().api_base,
            "https://api.stripe.com"
        );
    }

    #[test]
    fn test_admin_token_validation() {
        let mut vars = minimal();
        vars.push(("ADMIN_API_TOKEN", "short"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));

        let mut vars = minimal();
        vars.push(("ADMIN_API_TOKEN", STRONG));
        assert!(load(&vars).unwrap().admin_token.is_some());
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(STRONG) > 3.3);
    }

    #[test]
    fn test_admin_token_matches() {
        let expected = SecretString::from(STRONG);
        assert!(admin_token_matches(&expected, STRONG));
        assert!(!admin_token_matches(&expected, "aB3$"));
        assert!(!admin_token_matches(&expected, &STRONG.replace('a', "b")));
    }

    #[test]
    fn test_socket_addr() {
        let config = load(&minimal()).unwrap();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_test_super_secret"),
            webhook_secret: SecretString::from("whsec_super_secret"),
            api_base: "https://api.stripe.com".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("api.stripe.com"));
        assert!(!debug_output.contains("sk_test_super_secret"));
        assert!(!debug_output.contains("whsec_super_secret"));
    }
}
