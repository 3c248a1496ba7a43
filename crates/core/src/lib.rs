//! White Label Shop Core - Shared domain library.
//!
//! This crate provides the types and pure business rules used by the other
//! workspace members:
//! - `server` - Storefront and admin HTTP API
//! - `cli` - Command-line tools for migrations, seeding and signature debugging
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. Anything that needs a clock, randomness or the network is
//! handed its inputs by the caller.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, emails, colors, order and contact statuses
//! - [`cart`] - Checkout line validation
//! - [`webhook`] - Webhook event names, envelopes and HMAC signatures

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;
pub mod webhook;

pub use types::*;
