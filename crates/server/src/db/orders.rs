//! Order repository.
//!
//! Order creation is a single transaction: stock decrement, order header,
//! line items and invoice either all land or none do.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;
use whitelabel_core::{InvoiceId, OrderId, OrderItemId, OrderStatus, ProductId};

use super::{PgStore, RepositoryError};
use crate::models::{Invoice, NewOrder, Order, OrderDetail, OrderItem};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Atomically decrement stock and insert the order, its items and its invoice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::OutOfStock` (with nothing written) when any
    /// product no longer has enough stock.
    async fn create_order(&self, order: &NewOrder) -> Result<OrderDetail, RepositoryError>;

    /// All orders with items and invoices, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderDetail>, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError>;

    /// Set the status only if it still equals `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if the status changed concurrently.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    /// Delete the invoice, the items and the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError>;
}

const ORDER_COLUMNS: &str =
    "id, user_id, customer_email, customer_name, total, status, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price";
const INVOICE_COLUMNS: &str = "id, order_id, created_at";

#[async_trait]
impl OrderRepository for PgStore {
    async fn create_order(&self, new: &NewOrder) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // Lock rows in a stable order so concurrent checkouts cannot deadlock.
        let mut decrements: Vec<(ProductId, i32)> = new
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        decrements.sort_by_key(|(id, _)| *id);

        for (product_id, quantity) in decrements {
            let result = sqlx::query(
                r"
                UPDATE products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(RepositoryError::OutOfStock(product_id));
            }
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO orders (id, user_id, customer_email, customer_name, total, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(OrderId::new())
        .bind(new.user_id)
        .bind(new.customer_email.as_ref())
        .bind(new.customer_name.as_deref())
        .bind(new.total)
        .bind(OrderStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for (position, item) in (0_i32..).zip(&new.items) {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                r"
                INSERT INTO order_items
                    (id, order_id, product_id, product_name, quantity, price, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {ITEM_COLUMNS}
                "
            ))
            .bind(OrderItemId::new())
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(position)
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "INSERT INTO invoices (id, order_id) VALUES ($1, $2) RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(InvoiceId::new())
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(OrderDetail {
            order,
            items,
            invoice: Some(invoice),
        })
    }

    async fn list_orders(&self) -> Result<Vec<OrderDetail>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();

        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY position"
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
        let mut invoice_by_order: HashMap<OrderId, Invoice> = invoices
            .into_iter()
            .map(|invoice| (invoice.order_id, invoice))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail {
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                invoice: invoice_by_order.remove(&order.id),
                order,
            })
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY position"
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(Some(OrderDetail {
            order,
            items,
            invoice,
        }))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let updated = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool())
        .await?;

        if let Some(order) = updated {
            return Ok(order);
        }

        let exists: Option<(OrderStatus,)> =
            sqlx::query_as("SELECT status FROM orders WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        match exists {
            None => Err(RepositoryError::NotFound),
            Some((current,)) => Err(RepositoryError::Conflict(format!(
                "order status is {current}, expected {from}"
            ))),
        }
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx: Transaction<'_, Postgres> = self.pool().begin().await?;

        sqlx::query("DELETE FROM invoices WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
