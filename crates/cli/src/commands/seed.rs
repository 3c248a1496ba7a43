//! Seed store settings and a small sample catalog.

use rust_decimal::Decimal;
use tracing::info;
use whitelabel_server::db::{self, PgStore, ProductRepository, StoreConfigRepository};
use whitelabel_server::models::{ProductInput, ProductQuery, StoreConfigUpdate};

use super::migrate::database_url;

/// (name, description, price in cents, stock)
const SAMPLE_PRODUCTS: [(&str, &str, i64, i32); 3] = [
    ("Classic Tee", "Soft cotton t-shirt", 2500, 50),
    ("Canvas Tote", "Everyday carry bag", 1800, 30),
    ("Enamel Mug", "Keeps coffee warm", 1200, 0),
];

/// Write the branded settings and insert the sample products.
///
/// Products are skipped when the catalog already has entries, unless `force`.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a write fails.
pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);

    let settings = StoreConfigUpdate {
        store_name: Some("White Label Shop".to_string()),
        store_description: Some(Some("Your one-stop shop".to_string())),
        logo_url: None,
        primary_color: Some("#007acc".to_string()),
        currency: Some("USD".to_string()),
    }
    .validated()
    .map_err(|e| format!("invalid seed settings: {e}"))?;
    let config = store.update_config(&settings).await?;
    info!(store_name = %config.store_name, "Store settings seeded");

    if !force && store.list_products(&ProductQuery::default()).await?.total > 0 {
        info!("Catalog is not empty, skipping sample products (use --force to add anyway)");
        return Ok(());
    }

    for (name, description, cents, stock) in SAMPLE_PRODUCTS {
        let input = ProductInput {
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(cents, 2),
            stock,
            images: Vec::new(),
        };
        let product = store.create_product(&input).await?;
        info!(id = %product.id, name = %product.name, "Product created");
    }

    info!("Seeding complete!");
    Ok(())
}
