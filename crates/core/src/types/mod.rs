//! Core types for the White Label Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod color;
pub mod contact;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use color::{ColorError, HexColor};
pub use contact::ContactStatus;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{AmountError, CurrencyCode, MAX_AMOUNT, Price, check_amount};
pub use status::*;
