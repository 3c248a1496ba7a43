//! Order administration and the status lifecycle.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, info, instrument};
use whitelabel_core::webhook::WebhookEvent;
use whitelabel_core::{InvalidTransition, OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{Order, OrderDetail};
use crate::services::webhooks::{WebhookDispatcher, payload};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The status changed between read and write.
    #[error("{0}")]
    Conflict(String),

    #[error("persistence failure: {0}")]
    Persistence(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Persistence(other),
        }
    }
}

/// Cached admin order listing.
///
/// Anything that creates, updates or deletes an order calls
/// [`revalidate`](Self::revalidate).
#[derive(Clone)]
pub struct OrderListingCache {
    cache: Cache<(), Arc<Vec<OrderDetail>>>,
}

impl OrderListingCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    async fn get(&self) -> Option<Arc<Vec<OrderDetail>>> {
        self.cache.get(&()).await
    }

    async fn put(&self, orders: Arc<Vec<OrderDetail>>) {
        self.cache.insert((), orders).await;
    }

    pub async fn revalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    dispatcher: WebhookDispatcher,
    listing: OrderListingCache,
}

impl OrderService {
    #[must_use]
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        dispatcher: WebhookDispatcher,
        listing: OrderListingCache,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            listing,
        }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Persistence` if the listing cannot be loaded.
    pub async fn list(&self) -> Result<Arc<Vec<OrderDetail>>, OrderError> {
        if let Some(orders) = self.listing.get().await {
            debug!("Cache hit for order listing");
            return Ok(orders);
        }

        let orders = Arc::new(self.repo.list_orders().await?);
        self.listing.put(orders.clone()).await;
        Ok(orders)
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown id.
    pub async fn get(&self, id: OrderId) -> Result<OrderDetail, OrderError> {
        self.repo.get_order(id).await?.ok_or(OrderError::NotFound)
    }

    /// Move an order to `to` and announce it with `order.updated`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` when the lifecycle forbids the
    /// move (including a move to the current status) and
    /// `OrderError::Conflict` if another writer changed the status first.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn update_status(&self, id: OrderId, to: OrderStatus) -> Result<Order, OrderError> {
        let current = self.get(id).await?.order;
        let previous = current.status;
        previous.transition_to(to)?;

        let order = self.repo.update_order_status(id, previous, to).await?;
        info!(from = %previous, to = %to, "Order status updated");

        self.dispatcher
            .dispatch(
                WebhookEvent::OrderUpdated,
                payload::order_updated(&order, previous),
            )
            .await;
        self.listing.revalidate().await;
        Ok(order)
    }

    /// Delete the order with its items and invoice.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown id.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete(&self, id: OrderId) -> Result<(), OrderError> {
        self.repo.delete_order(id).await?;
        info!("Order deleted");
        self.listing.revalidate().await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewOrder, NewOrderItem};
    use crate::services::webhooks::HttpDeliverer;

    async fn setup() -> (Arc<MemoryStore>, OrderService, OrderId) {
        let store = Arc::new(MemoryStore::new());
        let product = store
            .seed_product("Mug", Decimal::from_str("8.00").unwrap(), 5)
            .await;
        let detail = store
            .create_order(&NewOrder {
                user_id: None,
                customer_email: None,
                customer_name: None,
                total: Decimal::from_str("8.00").unwrap(),
                items: vec![NewOrderItem {
                    product_id: product.id,
                    product_name: product.name,
                    quantity: 1,
                    price: Decimal::from_str("8.00").unwrap(),
                }],
            })
            .await
            .unwrap();

        // No subscriptions exist, so the deliverer is never called.
        let deliverer = Arc::new(HttpDeliverer::new(Duration::from_secs(1)).unwrap());
        let dispatcher = WebhookDispatcher::new(store.clone(), deliverer);
        let service = OrderService::new(
            store.clone(),
            dispatcher,
            OrderListingCache::new(Duration::from_secs(60)),
        );
        (store, service, detail.order.id)
    }

    #[tokio::test]
    async fn test_lifecycle_to_completion() {
        let (_store, service, id) = setup().await;
        for status in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Completed] {
            let order = service.update_status(id, status).await.unwrap();
            assert_eq!(order.status, status);
        }

        let err = service
            .update_status(id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_same_status_rejected() {
        let (_store, service, id) = setup().await;
        let err = service
            .update_status(id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_listing_revalidated_after_change() {
        let (_store, service, id) = setup().await;
        let before = service.list().await.unwrap();
        assert_eq!(before[0].order.status, OrderStatus::Pending);

        service.update_status(id, OrderStatus::Paid).await.unwrap();
        let after = service.list().await.unwrap();
        assert_eq!(after[0].order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_unknown_is_not_found() {
        let (store, service, id) = setup().await;
        service.delete(id).await.unwrap();
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.invoice_count().await, 0);
        assert!(matches!(service.delete(id).await, Err(OrderError::NotFound)));
        assert!(service.list().await.unwrap().is_empty());
    }
}
