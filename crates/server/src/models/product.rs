//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use whitelabel_core::{AmountError, ProductId, check_amount};
use whitelabel_core::cart::FieldErrors;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Units on hand; never negative.
    pub stock: i32,
    /// Image URLs in display order.
    #[sqlx(json)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog ordering for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    Name,
}

/// Storefront listing filters, read from the query string.
///
/// `q` matches name or description, case-insensitively. Price bounds are
/// inclusive. Pages start at 1 and hold [`ProductQuery::PAGE_SIZE`] products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
}

impl ProductQuery {
    pub const PAGE_SIZE: u32 = 12;

    /// Trimmed search term, `None` when blank.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// 1-based page number; 0 is treated as 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Rows to skip for the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(Self::PAGE_SIZE)
    }

    /// Whether `product` passes the search and price filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let text = self.search().is_none_or(|q| {
            let q = q.to_lowercase();
            product.name.to_lowercase().contains(&q)
                || product.description.to_lowercase().contains(&q)
        });
        text && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
    }
}

/// One page of a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    /// Products matching the filters across all pages.
    pub total: u64,
    pub total_pages: u64,
}

impl ProductPage {
    #[must_use]
    pub fn new(products: Vec<Product>, query: &ProductQuery, total: u64) -> Self {
        Self {
            products,
            page: query.page(),
            per_page: ProductQuery::PAGE_SIZE,
            total,
            total_pages: total.div_ceil(u64::from(ProductQuery::PAGE_SIZE)),
        }
    }
}

/// Admin create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductInput {
    pub const MAX_NAME_LENGTH: usize = 200;

    /// Field-level validation.
    ///
    /// # Errors
    ///
    /// Returns every problem found, keyed by field name.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if name.chars().count() > Self::MAX_NAME_LENGTH {
            errors.add(
                "name",
                format!("Name must be at most {} characters", Self::MAX_NAME_LENGTH),
            );
        }
        match check_amount(self.price) {
            Ok(()) => {}
            Err(AmountError::Negative) => errors.add("price", "Price must be positive"),
            Err(AmountError::TooPrecise) => {
                errors.add("price", "Price must have at most two decimal places");
            }
            Err(AmountError::OutOfRange) => errors.add("price", "Price is out of range"),
        }
        if self.stock < 0 {
            errors.add("stock", "Stock must not be negative");
        }
        for (index, image) in self.images.iter().enumerate() {
            let valid = url::Url::parse(image)
                .is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
            if !valid {
                errors.add(format!("images[{index}]"), "Image must be an http(s) URL");
            }
        }

        errors.into_result()
    }
}
