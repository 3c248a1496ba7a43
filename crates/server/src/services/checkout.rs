//! Checkout: turn a submitted cart into a persisted order.
//!
//! Validation and availability checks happen before any write. The order,
//! its items, its invoice and the stock decrements are then written in one
//! repository call, which either commits all of them or none.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use whitelabel_core::cart::{CartLine, FieldErrors, ValidatedCart, validate_cart};
use whitelabel_core::webhook::WebhookEvent;
use whitelabel_core::{Email, ProductId, UserId};

use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{NewOrder, NewOrderItem, OrderDetail, Product};
use crate::services::orders::OrderListingCache;
use crate::services::webhooks::{WebhookDispatcher, payload};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid checkout request: {0}")]
    Validation(FieldErrors),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for {name}")]
    InsufficientStock { product_id: ProductId, name: String },

    #[error("checkout failed: {0}")]
    Persistence(RepositoryError),
}

/// Checkout request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub customer: Option<CustomerDetails>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A request that passed structural validation.
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub cart: ValidatedCart,
    pub customer_email: Option<Email>,
    pub customer_name: Option<String>,
    pub user_id: Option<UserId>,
}

impl CheckoutRequest {
    /// Check cart lines, total and customer contact details.
    ///
    /// # Errors
    ///
    /// Returns every field-level problem found.
    pub fn validate(&self) -> Result<ValidatedCheckout, FieldErrors> {
        let mut errors = FieldErrors::new();

        let (customer_email, customer_name) = match &self.customer {
            Some(customer) => {
                let email = match Email::parse(&customer.email) {
                    Ok(email) => Some(email),
                    Err(e) => {
                        errors.add("customer.email", e.to_string());
                        None
                    }
                };
                let name = customer
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(ToString::to_string);
                (email, name)
            }
            None => (None, None),
        };

        let lines: Vec<CartLine> = self
            .items
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.price,
            })
            .collect();

        match validate_cart(&lines, self.total) {
            Ok(cart) => {
                errors.into_result()?;
                Ok(ValidatedCheckout {
                    cart,
                    customer_email,
                    customer_name,
                    user_id: None,
                })
            }
            Err(cart_errors) => {
                errors.merge(cart_errors);
                Err(errors)
            }
        }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    dispatcher: WebhookDispatcher,
    listing: OrderListingCache,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        dispatcher: WebhookDispatcher,
        listing: OrderListingCache,
    ) -> Self {
        Self {
            products,
            orders,
            dispatcher,
            listing,
        }
    }

    /// Resolve every product in one lookup and check current stock.
    ///
    /// Returns products keyed by id. Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::ProductNotFound` or
    /// `CheckoutError::InsufficientStock` for the first failing line.
    pub async fn check_availability(
        &self,
        cart: &ValidatedCart,
    ) -> Result<HashMap<ProductId, Product>, CheckoutError> {
        let products: HashMap<ProductId, Product> = self
            .products
            .get_products(&cart.product_ids())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load products for checkout");
                CheckoutError::Persistence(e)
            })?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        for line in cart.lines() {
            let product = products
                .get(&line.product_id)
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    name: product.name.clone(),
                });
            }
        }

        Ok(products)
    }

    /// Create the order, announce it with `order.created` and revalidate
    /// the admin listing.
    ///
    /// # Errors
    ///
    /// Any error means nothing was written.
    #[instrument(skip(self, checkout), fields(lines = checkout.cart.lines().len()))]
    pub async fn place_order(
        &self,
        checkout: &ValidatedCheckout,
    ) -> Result<OrderDetail, CheckoutError> {
        let products = self.check_availability(&checkout.cart).await?;

        let items = checkout
            .cart
            .lines()
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                product_name: products
                    .get(&line.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect();

        let new = NewOrder {
            user_id: checkout.user_id,
            customer_email: checkout.customer_email.clone(),
            customer_name: checkout.customer_name.clone(),
            total: checkout.cart.total(),
            items,
        };

        let detail = self.orders.create_order(&new).await.map_err(|e| match e {
            RepositoryError::OutOfStock(product_id) => {
                warn!(product_id = %product_id, "Stock ran out during checkout");
                CheckoutError::InsufficientStock {
                    product_id,
                    name: products
                        .get(&product_id)
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                }
            }
            other => {
                error!(error = %other, total = %new.total, "Failed to create order");
                CheckoutError::Persistence(other)
            }
        })?;

        info!(order_id = %detail.order.id, total = %detail.order.total, "Order created");

        self.dispatcher
            .dispatch(WebhookEvent::OrderCreated, payload::order_created(&detail))
            .await;
        self.listing.revalidate().await;
        Ok(detail)
    }
}
