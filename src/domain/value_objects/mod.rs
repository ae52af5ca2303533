//! Value Objects for the storefront core

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when a combination is rendered as a single key.
pub const KEY_SEPARATOR: &str = "|";

/// One value per attribute, in attribute declaration order.
pub type Combination = Vec<String>;

/// Joins a combination into its display/payload key.
pub fn combination_key(values: &[String]) -> String { values.join(KEY_SEPARATOR) }

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Default SKU for a combination: whitespace stripped, upper-cased, hyphen-joined.
    pub fn generate(values: &[String]) -> Self {
        let parts: Vec<String> = values
            .iter()
            .map(|v| v.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase())
            .collect();
        Self(parts.join("-"))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Line item quantity. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Option<Self> { (value > 0).then_some(Self(value)) }

    /// `None` for zero or negative input; saturates above `u32::MAX`.
    pub fn from_signed(value: i64) -> Option<Self> {
        if value <= 0 { return None; }
        Some(Self(u32::try_from(value).unwrap_or(u32::MAX)))
    }

    pub fn value(&self) -> u32 { self.0 }
    pub fn increment(&self) -> Self { Self(self.0.saturating_add(1)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }
