//! Variant Matrix Aggregate
//!
//! Keeps one [`VariantRecord`] per combination reachable from a product's
//! attribute set. Every attribute mutation rebuilds the full cartesian
//! product; rows whose combination survives keep their record untouched,
//! rows that are no longer reachable are dropped.
//!
//! An attribute without values still takes part in the product as a single
//! empty placeholder, so a half-configured product yields editable rows
//! instead of none.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::events::{DomainEvent, VariantEvent};
use crate::domain::value_objects::{combination_key, Combination, Sku};

/// Upper bound on rows a single product may expand to.
pub const DEFAULT_MAX_COMBINATIONS: usize = 1000;

/// A named axis of product variation, e.g. `Color` with `Red, Blue`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), values: vec![] } }

    fn matches(&self, name: &str) -> bool { self.name.to_lowercase() == name.trim().to_lowercase() }

    /// Values this attribute contributes to the product; never empty.
    fn axis(&self) -> Vec<String> {
        if self.values.is_empty() { vec![String::new()] } else { self.values.clone() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    #[serde(default)]
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRow {
    /// Joined combination, for display. Ignored when a draft is loaded.
    #[serde(default)]
    pub key: String,
    pub combination: Combination,
    #[serde(default)]
    pub record: VariantRecord,
}

impl VariantRow {
    fn new(combination: Combination, record: VariantRecord) -> Self {
        Self { key: combination_key(&combination), combination, record }
    }
}

/// The JSON document submitted by the admin "save" action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariantsDraft {
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub variants: Vec<VariantRow>,
    #[serde(default)]
    pub auto_sku: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("{combinations} variant combinations exceed the limit of {limit}")]
    TooManyCombinations { combinations: u128, limit: usize },
}

/// Cartesian product of the axes, first axis varying slowest.
pub fn cartesian(axes: &[Vec<String>]) -> Vec<Combination> {
    axes.iter().fold(vec![Vec::new()], |acc, axis| {
        acc.iter()
            .flat_map(|prefix| axis.iter().map(move |value| {
                let mut combo = prefix.clone();
                combo.push(value.clone());
                combo
            }))
            .collect()
    })
}

/// Number of rows an attribute set expands to. Saturates instead of overflowing.
pub fn combination_count(attributes: &[Attribute]) -> u128 {
    attributes.iter().fold(1u128, |acc, a| acc.saturating_mul(a.values.len().max(1) as u128))
}

/// Splits comma separated input into trimmed, non-empty, de-duplicated values.
fn parse_values(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in raw.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        if !out.iter().any(|v| v == value) { out.push(value.to_string()); }
    }
    out
}

#[derive(Clone, Debug)]
pub struct VariantMatrix {
    attributes: Vec<Attribute>,
    rows: Vec<VariantRow>,
    auto_sku: bool,
    max_combinations: usize,
    events: Vec<DomainEvent>,
}

impl Default for VariantMatrix {
    fn default() -> Self { Self::new(DEFAULT_MAX_COMBINATIONS) }
}

impl VariantMatrix {
    pub fn new(max_combinations: usize) -> Self {
        Self {
            attributes: vec![],
            rows: vec![VariantRow::new(vec![], VariantRecord::default())],
            auto_sku: false,
            max_combinations: max_combinations.max(1),
            events: vec![],
        }
    }

    /// Loads a submitted draft. Attributes go through the same normalization
    /// as the interactive operations; supplied rows are kept where their
    /// combination is still reachable.
    pub fn from_draft(draft: ProductVariantsDraft, max_combinations: usize) -> Result<Self, VariantError> {
        let mut matrix = Self::new(max_combinations);
        matrix.auto_sku = draft.auto_sku;
        let mut attributes: Vec<Attribute> = Vec::new();
        for attr in draft.attributes {
            let name = attr.name.trim();
            if name.is_empty() || attributes.iter().any(|a| a.matches(name)) { continue; }
            let mut normalized = Attribute::new(name);
            for value in attr.values.iter().flat_map(|v| parse_values(v)) {
                if !normalized.values.contains(&value) { normalized.values.push(value); }
            }
            attributes.push(normalized);
        }
        matrix.rows = draft.variants;
        matrix.rebuild(attributes)?;
        Ok(matrix)
    }

    pub fn to_draft(&self) -> ProductVariantsDraft {
        ProductVariantsDraft { attributes: self.attributes.clone(), variants: self.rows.clone(), auto_sku: self.auto_sku }
    }

    pub fn attributes(&self) -> &[Attribute] { &self.attributes }
    pub fn rows(&self) -> &[VariantRow] { &self.rows }
    pub fn auto_sku(&self) -> bool { self.auto_sku }
    pub fn max_combinations(&self) -> usize { self.max_combinations }

    pub fn row(&self, key: &str) -> Option<&VariantRow> { self.rows.iter().find(|r| r.key == key) }

    pub fn record_mut(&mut self, combination: &[String]) -> Option<&mut VariantRecord> {
        self.rows.iter_mut().find(|r| r.combination == combination).map(|r| &mut r.record)
    }

    /// Appends an empty attribute. Blank names and case-insensitive duplicates are ignored.
    pub fn add_attribute(&mut self, name: &str) -> Result<bool, VariantError> {
        let name = name.trim();
        if name.is_empty() || self.position(name).is_some() { return Ok(false); }
        let mut candidate = self.attributes.clone();
        candidate.push(Attribute::new(name));
        self.rebuild(candidate)?;
        self.raise_event(DomainEvent::Variant(VariantEvent::AttributeAdded { name: name.to_string() }));
        Ok(true)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Result<bool, VariantError> {
        let Some(idx) = self.position(name) else { return Ok(false) };
        let mut candidate = self.attributes.clone();
        let removed = candidate.remove(idx);
        self.rebuild(candidate)?;
        self.raise_event(DomainEvent::Variant(VariantEvent::AttributeRemoved { name: removed.name }));
        Ok(true)
    }

    /// Adds comma separated values to an attribute, skipping blanks and values already present.
    pub fn add_attribute_values(&mut self, attribute: &str, raw: &str) -> Result<bool, VariantError> {
        let Some(idx) = self.position(attribute) else { return Ok(false) };
        let existing = &self.attributes[idx].values;
        let added: Vec<String> = parse_values(raw).into_iter().filter(|v| !existing.contains(v)).collect();
        if added.is_empty() { return Ok(false); }
        let mut candidate = self.attributes.clone();
        candidate[idx].values.extend(added.iter().cloned());
        self.rebuild(candidate)?;
        let attribute = self.attributes[idx].name.clone();
        self.raise_event(DomainEvent::Variant(VariantEvent::ValuesAdded { attribute, values: added }));
        Ok(true)
    }

    pub fn remove_attribute_value(&mut self, attribute: &str, value: &str) -> Result<bool, VariantError> {
        let Some(idx) = self.position(attribute) else { return Ok(false) };
        if !self.attributes[idx].values.iter().any(|v| v == value) { return Ok(false); }
        let mut candidate = self.attributes.clone();
        candidate[idx].values.retain(|v| v != value);
        self.rebuild(candidate)?;
        let attribute = self.attributes[idx].name.clone();
        self.raise_event(DomainEvent::Variant(VariantEvent::ValueRemoved { attribute, value: value.to_string() }));
        Ok(true)
    }

    /// Rebuilds the rows from the current attribute set.
    pub fn regenerate(&mut self) -> Result<(), VariantError> {
        self.rebuild(self.attributes.clone())
    }

    /// Turning auto SKU on overwrites every row's SKU with the generated one.
    pub fn set_auto_sku(&mut self, enabled: bool) {
        self.auto_sku = enabled;
        if !enabled { return; }
        for row in &mut self.rows { row.record.sku = Sku::generate(&row.combination).into_string(); }
    }

    pub fn set_all_prices(&mut self, price: Option<Decimal>) {
        for row in &mut self.rows { row.record.price = price; }
    }

    pub fn set_all_stock(&mut self, stock: Option<u32>) {
        for row in &mut self.rows { row.record.stock = stock; }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn position(&self, name: &str) -> Option<usize> { self.attributes.iter().position(|a| a.matches(name)) }

    fn rebuild(&mut self, attributes: Vec<Attribute>) -> Result<(), VariantError> {
        let combinations = combination_count(&attributes);
        if combinations > self.max_combinations as u128 {
            tracing::warn!(combinations = %combinations, limit = self.max_combinations, "variant matrix exceeds combination cap");
            return Err(VariantError::TooManyCombinations { combinations, limit: self.max_combinations });
        }
        let axes: Vec<Vec<String>> = attributes.iter().map(Attribute::axis).collect();
        let mut previous: HashMap<Combination, VariantRecord> =
            self.rows.drain(..).map(|r| (r.combination, r.record)).collect();
        let rows: Vec<VariantRow> = cartesian(&axes)
            .into_iter()
            .map(|combo| {
                let record = previous.remove(&combo).unwrap_or_else(|| self.fresh_record(&combo));
                VariantRow::new(combo, record)
            })
            .collect();
        let dropped = previous.len();
        tracing::debug!(rows = rows.len(), dropped, "regenerated variant matrix");
        self.attributes = attributes;
        self.rows = rows;
        self.raise_event(DomainEvent::Variant(VariantEvent::Regenerated { rows: self.rows.len(), dropped }));
        Ok(())
    }

    fn fresh_record(&self, combination: &[String]) -> VariantRecord {
        let sku = if self.auto_sku { Sku::generate(combination).into_string() } else { String::new() };
        VariantRecord { sku, ..VariantRecord::default() }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
