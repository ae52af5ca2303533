//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::pricing::{calculate_totals, CartTotals, PricingError, PricingPolicy};
use crate::domain::value_objects::Quantity;

/// Product snapshot handed to "add to cart".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: Quantity,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

impl CartLineItem {
    pub fn from_product(product: CartProduct, quantity: Quantity) -> Self {
        let CartProduct { id, name, price, image, category, brand, weight } = product;
        Self { id, name, price, quantity, image, category, brand, weight }
    }

    /// `None` when the line amount overflows.
    pub fn line_total(&self) -> Option<Decimal> { self.price.checked_mul(Decimal::from(self.quantity.value())) }
}

#[derive(Clone, Debug)]
pub struct Cart {
    id: String,
    items: Vec<CartLineItem>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Default for Cart {
    fn default() -> Self { Self::new() }
}

impl Cart {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4().to_string(), items: vec![], updated_at: Utc::now(), events: vec![] }
    }

    /// Rebuilds a cart from a persisted line-item list. Zero-quantity lines are dropped.
    pub fn from_items(mut items: Vec<CartLineItem>) -> Self {
        items.retain(|i| i.quantity.value() > 0);
        let mut cart = Self::new();
        cart.items = items;
        cart
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Sum of quantities across all lines.
    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity.value())).sum() }

    pub fn totals(&self, policy: &PricingPolicy) -> Result<CartTotals, PricingError> { calculate_totals(&self.items, policy) }

    pub fn add_to_cart(&mut self, product: CartProduct) {
        let item_id = product.id.clone();
        let quantity = if let Some(existing) = self.items.iter_mut().find(|i| i.id == product.id) {
            existing.quantity = existing.quantity.increment();
            existing.quantity
        } else {
            let item = CartLineItem::from_product(product, Quantity::ONE);
            self.items.push(item);
            Quantity::ONE
        };
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded { item_id, quantity: quantity.value() }));
        self.touch();
    }

    /// Sets the quantity of a line; zero or negative removes it.
    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) {
        let Some(quantity) = Quantity::from_signed(quantity) else {
            self.remove_from_cart(item_id);
            return;
        };
        let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) else { return };
        item.quantity = quantity;
        self.raise_event(DomainEvent::Cart(CartEvent::QuantityUpdated { item_id: item_id.to_string(), quantity: quantity.value() }));
        self.touch();
    }

    pub fn remove_from_cart(&mut self, item_id: &str) {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before { return; }
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { item_id: item_id.to_string() }));
        self.touch();
    }

    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared));
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> CartProduct {
        CartProduct {
            id: id.into(), name: "Basmati Rice 1kg".into(), price: Decimal::from(price),
            image: "rice.png".into(), category: "staples".into(), brand: Some("India Gate".into()), weight: Some("1kg".into()),
        }
    }

    #[test]
    fn test_add_twice_increments() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.add_to_cart(product("P1", 100));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.add_to_cart(product("P2", 50));
        cart.update_quantity("P1", 0);
        assert_eq!(cart.items().len(), 1);
        let totals = cart.totals(&PricingPolicy::default()).unwrap();
        assert_eq!(totals.items_total, Decimal::from(50));
    }

    #[test]
    fn test_update_quantity_negative_removes() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.update_quantity("P1", -4);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.update_quantity("P1", 5);
        assert_eq!(cart.items()[0].quantity.value(), 5);
        assert_eq!(cart.items()[0].line_total(), Some(Decimal::from(500)));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.take_events();
        cart.update_quantity("nope", 3);
        cart.remove_from_cart("nope");
        assert_eq!(cart.items().len(), 1);
        assert!(cart.take_events().is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.add_to_cart(product("P2", 20));
        cart.remove_from_cart("P1");
        assert_eq!(cart.items()[0].id, "P2");
        cart.clear_cart();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_negative_price_accepted() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", -10));
        assert_eq!(cart.totals(&PricingPolicy::default()).unwrap().items_total, Decimal::from(-10));
    }

    #[test]
    fn test_events_recorded() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("P1", 100));
        cart.add_to_cart(product("P1", 100));
        cart.update_quantity("P1", 0);
        let events = cart.take_events();
        assert_eq!(events, vec![
            DomainEvent::Cart(CartEvent::ItemAdded { item_id: "P1".into(), quantity: 1 }),
            DomainEvent::Cart(CartEvent::ItemAdded { item_id: "P1".into(), quantity: 2 }),
            DomainEvent::Cart(CartEvent::ItemRemoved { item_id: "P1".into() }),
        ]);
        assert!(cart.take_events().is_empty());
    }
}
