//! BazarXpress storefront core
//!
//! Client-side logic of the BazarXpress grocery storefront and admin,
//! lifted out of the UI into plain Rust.
//!
//! ## Features
//! - Product variant matrix (cartesian attribute combinations with SKU/price/stock)
//! - Shopping cart with delivery, handling and tax totals
//! - Cart persistence as a single JSON array per device/session
//! - Environment driven pricing configuration

pub mod config;
pub mod domain;
pub mod storage;

use thiserror::Error;

pub use config::{AppConfig, ConfigError};
pub use domain::aggregates::{
    Attribute, Cart, CartLineItem, CartProduct, ProductVariantsDraft, VariantError, VariantMatrix, VariantRecord, VariantRow,
};
pub use domain::pricing::{calculate_totals, CartTotals, PricingError, PricingPolicy};
pub use domain::value_objects::{Quantity, Sku};
pub use storage::{CartStorage, FileCartStorage, MemoryCartStorage, PersistentCart, StorageError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Variant matrix error: {0}")]
    Variant(#[from] VariantError),

    #[error("Cart storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cart pricing error: {0}")]
    Pricing(#[from] PricingError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
