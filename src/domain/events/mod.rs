//! Domain events
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
    Variant(VariantEvent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { item_id: String, quantity: u32 },
    QuantityUpdated { item_id: String, quantity: u32 },
    ItemRemoved { item_id: String },
    Cleared,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantEvent {
    AttributeAdded { name: String },
    AttributeRemoved { name: String },
    ValuesAdded { attribute: String, values: Vec<String> },
    ValueRemoved { attribute: String, value: String },
    /// `dropped` counts rows whose combination is no longer reachable.
    Regenerated { rows: usize, dropped: usize },
}
