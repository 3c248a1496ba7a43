//! Checkout line validation.
//!
//! Validation here is purely structural: it needs no database and never
//! looks at stock. Product existence and availability are checked by the
//! checkout service afterwards.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::{AmountError, MAX_AMOUNT, ProductId, check_amount};

/// One line of a cart as submitted by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price the customer saw. This is what the order item records.
    pub unit_price: Decimal,
}

impl CartLine {
    /// `unit_price * quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A cart that passed [`validate_cart`].
///
/// Lines are in first-seen order with duplicate products merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCart {
    lines: Vec<CartLine>,
    total: Decimal,
}

impl ValidatedCart {
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|line| line.product_id).collect()
    }
}

/// Field-level validation messages, keyed by field path (e.g. `items[0].quantity`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Append every message from `other`.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one message was added.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn amount_message(error: AmountError) -> &'static str {
    match error {
        AmountError::Negative => "price must not be negative",
        AmountError::TooPrecise => "price must have at most two decimal places",
        AmountError::OutOfRange => "amount out of range",
    }
}

/// Round a money amount to cents for comparison.
fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate submitted cart lines against the submitted total.
///
/// Rules:
/// - at least one line
/// - every quantity is positive
/// - every unit price is non-negative, has at most two decimal places and
///   fits a stored price
/// - repeated products are merged when their unit prices agree
/// - `total` equals the sum of `unit_price * quantity`, compared in cents
///
/// # Errors
///
/// Returns every problem found as [`FieldErrors`].
pub fn validate_cart(lines: &[CartLine], total: Decimal) -> Result<ValidatedCart, FieldErrors> {
    let mut errors = FieldErrors::new();

    if lines.is_empty() {
        errors.add("items", "cart must contain at least one item");
        return Err(errors);
    }

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            errors.add(
                format!("items[{index}].quantity"),
                "quantity must be greater than zero",
            );
        }
        if let Err(error) = check_amount(line.unit_price) {
            errors.add(format!("items[{index}].price"), amount_message(error));
        }

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) if existing.unit_price == line.unit_price => {
                match existing.quantity.checked_add(line.quantity) {
                    Some(quantity) => existing.quantity = quantity,
                    None => errors.add(
                        format!("items[{index}].quantity"),
                        "quantity out of range",
                    ),
                }
            }
            Some(_) => errors.add(
                format!("items[{index}].price"),
                "the same product appears with different prices",
            ),
            None => merged.push(line.clone()),
        }
    }

    match check_amount(total) {
        Ok(()) => {}
        Err(AmountError::Negative) => errors.add("total", "total must not be negative"),
        Err(AmountError::TooPrecise) => {
            errors.add("total", "total must have at most two decimal places");
        }
        Err(AmountError::OutOfRange) => errors.add("total", "amount out of range"),
    }

    errors.clone().into_result()?;

    let computed = merged
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.line_total()?))
        .filter(|sum| *sum <= MAX_AMOUNT);
    let Some(computed) = computed else {
        errors.add("total", "amount out of range");
        return Err(errors);
    };
    if cents(computed) != cents(total) {
        errors.add(
            "total",
            format!("total {total} does not match the item sum {}", cents(computed)),
        );
    }

    errors.into_result()?;
    Ok(ValidatedCart {
        lines: merged,
        total: cents(computed),
    })
}
