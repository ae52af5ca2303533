//! Aggregates module
pub mod cart;
pub mod variant_matrix;

pub use cart::{Cart, CartLineItem, CartProduct};
pub use variant_matrix::{
    cartesian, combination_count, Attribute, ProductVariantsDraft, VariantError, VariantMatrix, VariantRecord, VariantRow,
    DEFAULT_MAX_COMBINATIONS,
};
