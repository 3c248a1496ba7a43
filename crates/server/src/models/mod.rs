//! Domain records as stored in `PostgreSQL` and returned by the JSON API.
//!
//! All records serialize with camelCase keys; money fields serialize as
//! decimal strings.

pub mod contact;
pub mod order;
pub mod product;
pub mod store_config;
pub mod webhook;

pub use contact::{Contact, ContactInput, NewContact};
pub use order::{Invoice, NewOrder, NewOrderItem, Order, OrderDetail, OrderItem};
pub use product::{Product, ProductInput, ProductPage, ProductQuery, ProductSort};
pub use store_config::{StoreConfig, StoreConfigUpdate};
pub use webhook::{Webhook, WebhookUpdate};
