//! Invoice document.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;
use whitelabel_core::{CurrencyCode, OrderId, Price};

use crate::error::Result;
use crate::models::OrderDetail;
use crate::state::AppState;

/// Shown for items whose product has since been deleted.
const DELETED_PRODUCT_NAME: &str = "Product";

/// Invoice row display data.
#[derive(Debug, Clone)]
pub struct InvoiceRow {
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

/// Printable invoice page.
#[derive(Template, WebTemplate)]
#[template(path = "invoice.html")]
pub struct InvoiceTemplate {
    pub store_name: String,
    pub number: String,
    pub date: String,
    pub status: String,
    pub rows: Vec<InvoiceRow>,
    pub total: String,
}

impl InvoiceTemplate {
    #[must_use]
    pub fn new(store_name: &str, detail: &OrderDetail, currency: CurrencyCode) -> Self {
        let money = |amount| Price::new(amount, currency).to_string();
        let id = detail.order.id.to_string();

        Self {
            store_name: store_name.to_string(),
            number: id.chars().take(8).collect(),
            date: detail.order.created_at.format("%Y-%m-%d").to_string(),
            status: detail.order.status.to_string(),
            rows: detail
                .items
                .iter()
                .map(|item| InvoiceRow {
                    name: if item.product_id.is_some() {
                        item.product_name.clone()
                    } else {
                        DELETED_PRODUCT_NAME.to_string()
                    },
                    quantity: item.quantity,
                    unit_price: money(item.price),
                    line_total: item.line_total().map(&money).unwrap_or_default(),
                })
                .collect(),
            total: money(detail.order.total),
        }
    }
}

/// Render the invoice for an order. Regenerated on every request.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<InvoiceTemplate> {
    let detail = state.orders().get(order_id).await?;
    let config = state.store_config().get().await?;
    Ok(InvoiceTemplate::new(
        &config.store_name,
        &detail,
        config.currency_code(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use whitelabel_core::{OrderItemId, OrderStatus, ProductId};

    use super::*;
    use crate::models::{Order, OrderItem};

    fn detail() -> OrderDetail {
        let id = OrderId::from_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let item = |product_id, name: &str, quantity, price: &str| OrderItem {
            id: OrderItemId::new(),
            order_id: id,
            product_id,
            product_name: name.to_string(),
            quantity,
            price: Decimal::from_str(price).unwrap(),
        };

        OrderDetail {
            order: Order {
                id,
                user_id: None,
                customer_email: None,
                customer_name: None,
                total: Decimal::from_str("27.97").unwrap(),
                status: OrderStatus::Paid,
                created_at: at,
                updated_at: at,
            },
            items: vec![
                item(Some(ProductId::new()), "Mug", 2, "9.99"),
                item(None, "Old Poster", 1, "7.99"),
            ],
            invoice: None,
        }
    }

    #[test]
    fn test_invoice_contents() {
        let html = InvoiceTemplate::new("Corner Shop", &detail(), CurrencyCode::EUR)
            .render()
            .unwrap();

        assert!(html.contains("Invoice #0f8fad5b"));
        assert!(html.contains("2026-03-14"));
        assert!(html.contains("PAID"));
        assert!(html.contains("Mug"));
        assert!(html.contains("€19.98"));
        assert!(html.contains("€27.97"));
        assert!(!html.contains("Old Poster"));
        assert!(html.contains("<td>Product</td>"));
    }
}
