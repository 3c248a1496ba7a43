//! In-memory implementation of every repository trait.
//!
//! Used by tests and for running the API without a database. Order creation
//! holds the product and order locks together, so it has the same
//! all-or-nothing behavior as the `PostgreSQL` transaction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use whitelabel_core::{
    ContactId, ContactStatus, InvoiceId, OrderId, OrderItemId, OrderStatus, ProductId, WebhookId,
};

use super::{
    ContactRepository, OrderRepository, ProductRepository, RepositoryError,
    StoreConfigRepository, WebhookRepository,
};
use crate::models::{
    Contact, Invoice, NewContact, NewOrder, Order, OrderDetail, OrderItem, Product,
    ProductInput, ProductPage, ProductQuery, ProductSort, StoreConfig, StoreConfigUpdate,
    Webhook, WebhookUpdate,
};

#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<Vec<Product>>,
    orders: Mutex<Vec<OrderDetail>>,
    webhooks: Mutex<Vec<Webhook>>,
    config: Mutex<Option<StoreConfig>>,
    contacts: Mutex<Vec<Contact>>,
    config_loads: AtomicU64,
    fail_order_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product directly, bypassing validation.
    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: String::new(),
            price,
            stock,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.products.lock().await.push(product.clone());
        product
    }

    /// Current stock, or `None` for an unknown product.
    pub async fn stock_of(&self, id: ProductId) -> Option<i32> {
        self.products
            .lock()
            .await
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock)
    }

    pub async fn order_count(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn order_item_count(&self) -> usize {
        self.orders
            .lock()
            .await
            .iter()
            .map(|o| o.items.len())
            .sum()
    }

    pub async fn invoice_count(&self) -> usize {
        self.orders
            .lock()
            .await
            .iter()
            .filter(|o| o.invoice.is_some())
            .count()
    }

    /// How many times the store configuration was read from storage.
    pub fn config_loads(&self) -> u64 {
        self.config_loads.load(Ordering::SeqCst)
    }

    /// Make subsequent order writes fail with a database error.
    pub fn fail_order_writes(&self, fail: bool) {
        self.fail_order_writes.store(fail, Ordering::SeqCst);
    }

    fn check_order_writes(&self) -> Result<(), RepositoryError> {
        if self.fail_order_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let products = self.products.lock().await;
        // Insertion position breaks ties the way `id DESC` does for equal timestamps.
        let mut matching: Vec<(usize, &Product)> = products
            .iter()
            .enumerate()
            .filter(|(_, p)| query.matches(p))
            .collect();

        matching.sort_by(|(ia, a), (ib, b)| {
            let newest = b.created_at.cmp(&a.created_at).then(ib.cmp(ia));
            match query.sort {
                ProductSort::Newest => newest,
                ProductSort::Oldest => newest.reverse(),
                ProductSort::PriceLow => a.price.cmp(&b.price).then(newest),
                ProductSort::PriceHigh => b.price.cmp(&a.price).then(newest),
                ProductSort::Name => a.name.cmp(&b.name).then(newest),
            }
        });

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let page = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(ProductQuery::PAGE_SIZE).unwrap_or(usize::MAX))
            .map(|(_, p)| p.clone())
            .collect();
        Ok(ProductPage::new(page, query, total))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .products
            .lock()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .products
            .lock()
            .await
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            price: input.price,
            stock: input.stock,
            images: input.images.clone(),
            created_at: now,
            updated_at: now,
        };
        self.products.lock().await.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut products = self.products.lock().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;

        product.name = input.name.trim().to_string();
        product.description.clone_from(&input.description);
        product.price = input.price;
        product.stock = input.stock;
        product.images.clone_from(&input.images);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, new: &NewOrder) -> Result<OrderDetail, RepositoryError> {
        let mut products = self.products.lock().await;
        let mut orders = self.orders.lock().await;
        self.check_order_writes()?;

        for item in &new.items {
            let available = products
                .iter()
                .find(|p| p.id == item.product_id)
                .map_or(0, |p| p.stock);
            if available < item.quantity {
                return Err(RepositoryError::OutOfStock(item.product_id));
            }
        }

        let now = Utc::now();
        for item in &new.items {
            if let Some(product) = products.iter_mut().find(|p| p.id == item.product_id) {
                product.stock -= item.quantity;
                product.updated_at = now;
            }
        }

        let order_id = OrderId::new();
        let detail = OrderDetail {
            order: Order {
                id: order_id,
                user_id: new.user_id,
                customer_email: new.customer_email.clone(),
                customer_name: new.customer_name.clone(),
                total: new.total,
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            },
            items: new
                .items
                .iter()
                .map(|item| OrderItem {
                    id: OrderItemId::new(),
                    order_id,
                    product_id: Some(item.product_id),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            invoice: Some(Invoice {
                id: InvoiceId::new(),
                order_id,
                created_at: now,
            }),
        };
        orders.push(detail.clone());
        Ok(detail)
    }

    async fn list_orders(&self) -> Result<Vec<OrderDetail>, RepositoryError> {
        Ok(self.orders.lock().await.iter().rev().cloned().collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        Ok(self
            .orders
            .lock()
            .await
            .iter()
            .find(|o| o.order.id == id)
            .cloned())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().await;
        self.check_order_writes()?;
        let detail = orders
            .iter_mut()
            .find(|o| o.order.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if detail.order.status != from {
            return Err(RepositoryError::Conflict(format!(
                "order status is {}, expected {from}",
                detail.order.status
            )));
        }
        detail.order.status = to;
        detail.order.updated_at = Utc::now();
        Ok(detail.order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut orders = self.orders.lock().await;
        self.check_order_writes()?;
        let before = orders.len();
        orders.retain(|o| o.order.id != id);
        if orders.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl WebhookRepository for MemoryStore {
    async fn list_webhooks(&self) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self.webhooks.lock().await.iter().rev().cloned().collect())
    }

    async fn list_active_webhooks(&self) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self
            .webhooks
            .lock()
            .await
            .iter()
            .filter(|w| w.active)
            .cloned()
            .collect())
    }

    async fn create_webhook(
        &self,
        url: &str,
        events: &[String],
        secret: &str,
    ) -> Result<Webhook, RepositoryError> {
        let hook = Webhook {
            id: WebhookId::new(),
            url: url.to_string(),
            events: events.to_vec(),
            secret: secret.to_string(),
            active: true,
            created_at: Utc::now(),
        };
        self.webhooks.lock().await.push(hook.clone());
        Ok(hook)
    }

    async fn update_webhook(
        &self,
        id: WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Webhook, RepositoryError> {
        let mut hooks = self.webhooks.lock().await;
        let hook = hooks
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(url) = &update.url {
            hook.url.clone_from(url);
        }
        if let Some(events) = &update.events {
            hook.events.clone_from(events);
        }
        if let Some(active) = update.active {
            hook.active = active;
        }
        Ok(hook.clone())
    }

    async fn set_webhook_secret(
        &self,
        id: WebhookId,
        secret: &str,
    ) -> Result<Webhook, RepositoryError> {
        let mut hooks = self.webhooks.lock().await;
        let hook = hooks
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(RepositoryError::NotFound)?;
        hook.secret = secret.to_string();
        Ok(hook.clone())
    }

    async fn delete_webhook(&self, id: WebhookId) -> Result<(), RepositoryError> {
        let mut hooks = self.webhooks.lock().await;
        let before = hooks.len();
        hooks.retain(|w| w.id != id);
        if hooks.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreConfigRepository for MemoryStore {
    async fn load_or_create_config(&self) -> Result<StoreConfig, RepositoryError> {
        self.config_loads.fetch_add(1, Ordering::SeqCst);
        let mut config = self.config.lock().await;
        Ok(config.get_or_insert_with(StoreConfig::with_defaults).clone())
    }

    async fn update_config(
        &self,
        update: &StoreConfigUpdate,
    ) -> Result<StoreConfig, RepositoryError> {
        let mut config = self.config.lock().await;
        let current = config.get_or_insert_with(StoreConfig::with_defaults);
        update.apply_to(current);
        Ok(current.clone())
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, RepositoryError> {
        let contact = Contact {
            id: ContactId::new(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            subject: contact.subject.clone(),
            message: contact.message.clone(),
            status: ContactStatus::New,
            created_at: Utc::now(),
        };
        self.contacts.lock().await.push(contact.clone());
        Ok(contact)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, RepositoryError> {
        Ok(self.contacts.lock().await.iter().rev().cloned().collect())
    }

    async fn set_contact_status(
        &self,
        id: ContactId,
        status: ContactStatus,
    ) -> Result<Contact, RepositoryError> {
        let mut contacts = self.contacts.lock().await;
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        contact.status = status;
        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: ContactId) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.lock().await;
        let before = contacts.len();
        contacts.retain(|c| c.id != id);
        if contacts.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::models::NewOrderItem;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_order_is_all_or_nothing() {
        let store = MemoryStore::new();
        let plenty = store.seed_product("Mug", dec("8.00"), 10).await;
        let scarce = store.seed_product("Poster", dec("15.00"), 1).await;

        let new = NewOrder {
            user_id: None,
            customer_email: None,
            customer_name: None,
            total: dec("46.00"),
            items: vec![
                NewOrderItem {
                    product_id: plenty.id,
                    product_name: plenty.name.clone(),
                    quantity: 2,
                    price: dec("8.00"),
                },
                NewOrderItem {
                    product_id: scarce.id,
                    product_name: scarce.name.clone(),
                    quantity: 2,
                    price: dec("15.00"),
                },
            ],
        };

        let err = store.create_order(&new).await.unwrap_err();
        assert!(matches!(err, RepositoryError::OutOfStock(id) if id == scarce.id));
        assert_eq!(store.stock_of(plenty.id).await, Some(10));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_status_update_checks_expected_status() {
        let store = MemoryStore::new();
        let product = store.seed_product("Mug", dec("8.00"), 10).await;
        let detail = store
            .create_order(&NewOrder {
                user_id: None,
                customer_email: None,
                customer_name: None,
                total: dec("8.00"),
                items: vec![NewOrderItem {
                    product_id: product.id,
                    product_name: product.name,
                    quantity: 1,
                    price: dec("8.00"),
                }],
            })
            .await
            .unwrap();

        let err = store
            .update_order_status(detail.order.id, OrderStatus::Paid, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let order = store
            .update_order_status(detail.order.id, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_config_created_once() {
        let store = MemoryStore::new();
        let first = store.load_or_create_config().await.unwrap();
        let second = store.load_or_create_config().await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.config_loads(), 2);
    }
}
