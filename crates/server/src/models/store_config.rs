//! Store branding and settings (singleton record).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use whitelabel_core::cart::FieldErrors;
use whitelabel_core::{CurrencyCode, HexColor, StoreConfigId};

pub const DEFAULT_STORE_NAME: &str = "My Shop";
pub const DEFAULT_STORE_DESCRIPTION: &str = "Welcome to our online store";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub id: StoreConfigId,
    pub store_name: String,
    pub store_description: Option<String>,
    pub logo_url: Option<String>,
    /// `#rrggbb`
    pub primary_color: String,
    /// ISO 4217 code
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl StoreConfig {
    /// The record created on first read.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            id: StoreConfigId::new(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            store_description: Some(DEFAULT_STORE_DESCRIPTION.to_string()),
            logo_url: None,
            primary_color: HexColor::DEFAULT.to_string(),
            currency: CurrencyCode::default().code().to_string(),
            updated_at: Utc::now(),
        }
    }

    /// Parsed currency; unknown codes fall back to USD.
    #[must_use]
    pub fn currency_code(&self) -> CurrencyCode {
        self.currency.parse().unwrap_or_default()
    }
}

/// Partial settings update.
///
/// For `storeDescription` and `logoUrl`, an explicit `null` clears the value
/// while an absent key leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfigUpdate {
    pub store_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub store_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub logo_url: Option<Option<String>>,
    pub primary_color: Option<String>,
    pub currency: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl StoreConfigUpdate {
    /// Validate and normalize the provided fields.
    ///
    /// # Errors
    ///
    /// Returns field-level messages for every invalid field.
    pub fn validated(mut self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(name) = &self.store_name {
            let name = name.trim();
            if name.is_empty() {
                errors.add("storeName", "Store name is required");
            }
            self.store_name = Some(name.to_string());
        }
        if let Some(color) = &self.primary_color {
            match HexColor::parse(color.trim()) {
                Ok(color) => self.primary_color = Some(color.to_string()),
                Err(e) => errors.add("primaryColor", e.to_string()),
            }
        }
        if let Some(currency) = &self.currency {
            match currency.trim().parse::<CurrencyCode>() {
                Ok(code) => self.currency = Some(code.code().to_string()),
                Err(e) => errors.add("currency", e),
            }
        }
        if let Some(Some(logo)) = &self.logo_url {
            let valid = url::Url::parse(logo).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
            if !valid {
                errors.add("logoUrl", "Logo must be an http(s) URL");
            }
        }

        errors.into_result().map(|()| self)
    }

    /// Apply to an in-memory record.
    pub fn apply_to(&self, config: &mut StoreConfig) {
        if let Some(name) = &self.store_name {
            config.store_name.clone_from(name);
        }
        if let Some(description) = &self.store_description {
            config.store_description.clone_from(description);
        }
        if let Some(logo) = &self.logo_url {
            config.logo_url.clone_from(logo);
        }
        if let Some(color) = &self.primary_color {
            config.primary_color.clone_from(color);
        }
        if let Some(currency) = &self.currency {
            config.currency.clone_from(currency);
        }
        config.updated_at = Utc::now();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::with_defaults();
        assert_eq!(config.store_name, "My Shop");
        assert_eq!(
            config.store_description.as_deref(),
            Some("Welcome to our online store")
        );
        assert_eq!(config.primary_color, "#6366f1");
        assert_eq!(config.currency_code(), CurrencyCode::USD);
        assert!(config.logo_url.is_none());
    }

    #[test]
    fn test_null_clears_absent_keeps() {
        let update: StoreConfigUpdate =
            serde_json::from_str(r#"{"storeDescription":null}"#).unwrap();
        assert_eq!(update.store_description, Some(None));
        assert_eq!(update.logo_url, None);

        let mut config = StoreConfig::with_defaults();
        config.logo_url = Some("https://cdn.example.com/logo.png".to_string());
        update.apply_to(&mut config);
        assert!(config.store_description.is_none());
        assert!(config.logo_url.is_some());
    }

    #[test]
    fn test_validated_normalizes() {
        let update = StoreConfigUpdate {
            store_name: Some("  Corner Shop ".to_string()),
            primary_color: Some("#ABCDEF".to_string()),
            currency: Some("eur".to_string()),
            ..StoreConfigUpdate::default()
        }
        .validated()
        .unwrap();

        assert_eq!(update.store_name.as_deref(), Some("Corner Shop"));
        assert_eq!(update.primary_color.as_deref(), Some("#abcdef"));
        assert_eq!(update.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_validated_rejects() {
        let errors = StoreConfigUpdate {
            store_name: Some(" ".to_string()),
            primary_color: Some("blue".to_string()),
            currency: Some("XYZ".to_string()),
            logo_url: Some(Some("not a url".to_string())),
            ..StoreConfigUpdate::default()
        }
        .validated()
        .unwrap_err();

        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["currency", "logoUrl", "primaryColor", "storeName"]);
    }
}
