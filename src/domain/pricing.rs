//! Cart pricing
//!
//! Totals are derived from the line items on every call and never stored,
//! so they cannot go stale.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::CartLineItem;

/// Delivery, handling and tax parameters applied to a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Delivery is waived when the items total is strictly above this.
    pub free_delivery_threshold: Decimal,
    pub delivery_fee: Decimal,
    pub handling_fee: Decimal,
    /// Fraction of the items total, e.g. `0.05` for 5%.
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_delivery_threshold: Decimal::from(500),
            delivery_fee: Decimal::from(25),
            handling_fee: Decimal::from(2),
            tax_rate: Decimal::new(5, 2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub items_total: Decimal,
    pub delivery_charge: Decimal,
    pub handling_charge: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("cart total exceeds the representable amount")]
    Overflow,
}

/// Prices a list of line items. Only the tax is rounded (half up, to a whole unit).
pub fn calculate_totals(items: &[CartLineItem], policy: &PricingPolicy) -> Result<CartTotals, PricingError> {
    let items_total = items.iter().try_fold(Decimal::ZERO, |acc, item| {
        item.line_total().and_then(|line| acc.checked_add(line)).ok_or(PricingError::Overflow)
    })?;
    let delivery_charge = if items_total > policy.free_delivery_threshold { Decimal::ZERO } else { policy.delivery_fee };
    let handling_charge = policy.handling_fee;
    let tax = items_total.checked_mul(policy.tax_rate).and_then(round_half_up).ok_or(PricingError::Overflow)?;
    let grand_total = items_total
        .checked_add(delivery_charge)
        .and_then(|t| t.checked_add(handling_charge))
        .and_then(|t| t.checked_add(tax))
        .ok_or(PricingError::Overflow)?;
    Ok(CartTotals { items_total, delivery_charge, handling_charge, tax, grand_total })
}

/// Rounds to the nearest integer with halves going towards positive infinity.
fn round_half_up(value: Decimal) -> Option<Decimal> {
    value.checked_add(Decimal::new(5, 1)).map(|v| v.floor())
}
