//! Product repository.

use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;
use whitelabel_core::ProductId;

use super::{PgStore, RepositoryError};
use crate::models::{Product, ProductInput, ProductPage, ProductQuery, ProductSort};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// One page of products matching `query`, in the requested order.
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products for the given ids in one lookup. Unknown ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn create_product(&self, input: &ProductInput) -> Result<Product, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError>;
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, images, created_at, updated_at";

const LISTING_FILTER: &str = r"
    ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
    AND ($2::numeric IS NULL OR price >= $2)
    AND ($3::numeric IS NULL OR price <= $3)
";

const fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "created_at DESC, id DESC",
        ProductSort::Oldest => "created_at ASC, id ASC",
        ProductSort::PriceLow => "price ASC, created_at DESC",
        ProductSort::PriceHigh => "price DESC, created_at DESC",
        ProductSort::Name => "name ASC, created_at DESC",
    }
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let pattern = query.search().map(contains_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products WHERE {LISTING_FILTER}"
        ))
        .bind(pattern.as_deref())
        .bind(query.min_price)
        .bind(query.max_price)
        .fetch_one(self.pool())
        .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE {LISTING_FILTER}
            ORDER BY {order}
            LIMIT $4 OFFSET $5
            ",
            order = order_by(query.sort),
        ))
        .bind(pattern.as_deref())
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(i64::from(ProductQuery::PAGE_SIZE))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await?;

        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {total}")))?;
        Ok(ProductPage::new(products, query, total))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(product)
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(products)
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products (id, name, description, price, stock, images)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(ProductId::new())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(Json(&input.images))
        .fetch_one(self.pool())
        .await?;

        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock = $5, images = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(Json(&input.images))
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
