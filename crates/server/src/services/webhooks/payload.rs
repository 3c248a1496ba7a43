//! `data` objects for order events.

use serde_json::{Value, json};
use whitelabel_core::OrderStatus;

use crate::models::{Order, OrderDetail};

/// `order.created`: `{orderId, total, items: [{productId, name, quantity, price}]}`.
#[must_use]
pub fn order_created(detail: &OrderDetail) -> Value {
    let items: Vec<Value> = detail
        .items
        .iter()
        .map(|item| {
            json!({
                "productId": item.product_id,
                "name": item.product_name,
                "quantity": item.quantity,
                "price": item.price,
            })
        })
        .collect();

    json!({
        "orderId": detail.order.id,
        "total": detail.order.total,
        "items": items,
    })
}

/// `order.updated`: `{orderId, status, previousStatus, total}`.
#[must_use]
pub fn order_updated(order: &Order, previous: OrderStatus) -> Value {
    json!({
        "orderId": order.id,
        "status": order.status,
        "previousStatus": previous,
        "total": order.total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use whitelabel_core::{OrderId, OrderItemId, ProductId};

    use super::*;
    use crate::models::OrderItem;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(),
            user_id: None,
            customer_email: None,
            customer_name: None,
            total: Decimal::from_str("19.98").unwrap(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_created_shape() {
        let order = order(OrderStatus::Pending);
        let product_id = ProductId::new();
        let detail = OrderDetail {
            items: vec![OrderItem {
                id: OrderItemId::new(),
                order_id: order.id,
                product_id: Some(product_id),
                product_name: "Mug".to_string(),
                quantity: 2,
                price: Decimal::from_str("9.99").unwrap(),
            }],
            invoice: None,
            order,
        };

        let data = order_created(&detail);
        assert_eq!(data["orderId"], detail.order.id.to_string());
        assert_eq!(data["total"], "19.98");
        assert_eq!(data["items"][0]["productId"], product_id.to_string());
        assert_eq!(data["items"][0]["name"], "Mug");
        assert_eq!(data["items"][0]["quantity"], 2);
        assert_eq!(data["items"][0]["price"], "9.99");
    }

    #[test]
    fn test_order_updated_shape() {
        let data = order_updated(&order(OrderStatus::Paid), OrderStatus::Pending);
        assert_eq!(data["status"], "PAID");
        assert_eq!(data["previousStatus"], "PENDING");
        assert_eq!(data["total"], "19.98");
    }
}
