//! Cart persistence
//!
//! The cart lives on the shopper's device as one JSON array under a fixed
//! key. Every mutation rewrites the whole array; there are no partial
//! updates and no schema versioning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::domain::aggregates::{Cart, CartLineItem, CartProduct};
use crate::domain::events::DomainEvent;
use crate::domain::pricing::{CartTotals, PricingError, PricingPolicy};

pub const CART_STORAGE_KEY: &str = "bazarxpress_cart";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cart storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cart could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid cart session id: {0:?}")]
    InvalidSession(String),
}

pub trait CartStorage {
    fn read(&self) -> Result<Vec<CartLineItem>, StorageError>;
    fn write(&self, items: &[CartLineItem]) -> Result<(), StorageError>;
}

/// Decodes a stored cart. Unreadable payloads are treated as an empty cart.
fn decode(raw: &str, origin: &str) -> Vec<CartLineItem> {
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(origin, error = %e, "discarding unreadable cart payload");
            vec![]
        }
    }
}

/// Cart stored as `<dir>/bazarxpress_cart.json`.
#[derive(Clone, Debug)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{CART_STORAGE_KEY}.json")) }
    }

    /// Scopes the cart file to `<root>/<session>/`.
    pub fn for_session(root: impl AsRef<Path>, session: &str) -> Result<Self, StorageError> {
        let valid = !session.is_empty()
            && session.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid { return Err(StorageError::InvalidSession(session.to_string())); }
        Ok(Self::new(root.as_ref().join(session)))
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl CartStorage for FileCartStorage {
    fn read(&self) -> Result<Vec<CartLineItem>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        Ok(decode(&raw, &self.path.display().to_string()))
    }

    fn write(&self, items: &[CartLineItem]) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() { fs::create_dir_all(dir)?; }
        let json = serde_json::to_vec(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory stand-in for browser local storage; holds the serialized string.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    value: Mutex<Option<String>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self { Self::default() }

    pub fn with_raw(raw: impl Into<String>) -> Self { Self { value: Mutex::new(Some(raw.into())) } }

    pub fn raw(&self) -> Option<String> { self.slot().clone() }

    /// The stored string is always whole, so a poisoned lock is still usable.
    fn slot(&self) -> MutexGuard<'_, Option<String>> { self.value.lock().unwrap_or_else(PoisonError::into_inner) }
}

impl CartStorage for MemoryCartStorage {
    fn read(&self) -> Result<Vec<CartLineItem>, StorageError> {
        Ok(self.raw().map(|raw| decode(&raw, CART_STORAGE_KEY)).unwrap_or_default())
    }

    fn write(&self, items: &[CartLineItem]) -> Result<(), StorageError> {
        let json = serde_json::to_string(items)?;
        *self.slot() = Some(json);
        Ok(())
    }
}

/// A cart that writes its whole line-item list back after every mutation.
#[derive(Debug)]
pub struct PersistentCart<S: CartStorage> {
    cart: Cart,
    storage: S,
}

impl<S: CartStorage> PersistentCart<S> {
    pub fn open(storage: S) -> Result<Self, StorageError> {
        let cart = Cart::from_items(storage.read()?);
        Ok(Self { cart, storage })
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn storage(&self) -> &S { &self.storage }
    pub fn items(&self) -> &[CartLineItem] { self.cart.items() }
    pub fn totals(&self, policy: &PricingPolicy) -> Result<CartTotals, PricingError> { self.cart.totals(policy) }
    pub fn take_events(&mut self) -> Vec<DomainEvent> { self.cart.take_events() }

    pub fn add_to_cart(&mut self, product: CartProduct) -> Result<(), StorageError> {
        self.cart.add_to_cart(product);
        self.flush()
    }

    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) -> Result<(), StorageError> {
        self.cart.update_quantity(item_id, quantity);
        self.flush()
    }

    pub fn remove_from_cart(&mut self, item_id: &str) -> Result<(), StorageError> {
        self.cart.remove_from_cart(item_id);
        self.flush()
    }

    pub fn clear_cart(&mut self) -> Result<(), StorageError> {
        self.cart.clear_cart();
        self.flush()
    }

    fn flush(&self) -> Result<(), StorageError> { self.storage.write(self.cart.items()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn product(id: &str, price: i64) -> CartProduct {
        CartProduct {
            id: id.into(), name: "Toor Dal".into(), price: Decimal::from(price),
            image: String::new(), category: "pulses".into(), brand: None, weight: Some("500g".into()),
        }
    }

    fn temp_root() -> PathBuf { std::env::temp_dir().join(format!("bazarxpress-test-{}", Uuid::new_v4())) }

    #[test]
    fn test_file_storage_survives_reopen() {
        let root = temp_root();
        let storage = FileCartStorage::for_session(&root, "session-1").unwrap();
        let mut cart = PersistentCart::open(storage.clone()).unwrap();
        cart.add_to_cart(product("D1", 120)).unwrap();
        cart.add_to_cart(product("D1", 120)).unwrap();
        cart.add_to_cart(product("D2", 80)).unwrap();
        cart.update_quantity("D2", 0).unwrap();

        let reopened = PersistentCart::open(storage).unwrap();
        assert_eq!(reopened.items().len(), 1);
        assert_eq!(reopened.items()[0].quantity.value(), 2);
        assert_eq!(reopened.totals(&PricingPolicy::default()).unwrap().items_total, Decimal::from(240));
        assert!(reopened.storage().path().ends_with("session-1/bazarxpress_cart.json"));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_missing_file_is_empty_cart() {
        let cart = PersistentCart::open(FileCartStorage::new(temp_root())).unwrap();
        assert!(cart.cart().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty_cart() {
        let root = temp_root();
        let storage = FileCartStorage::new(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(storage.path(), "{not json").unwrap();
        assert!(storage.read().unwrap().is_empty());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_invalid_session_rejected() {
        for session in ["", "../etc", "a/b", "sess ion"] {
            assert!(matches!(FileCartStorage::for_session("/tmp", session), Err(StorageError::InvalidSession(_))));
        }
    }

    #[test]
    fn test_memory_storage_writes_whole_array() {
        let mut cart = PersistentCart::open(MemoryCartStorage::new()).unwrap();
        cart.add_to_cart(product("D1", 100)).unwrap();
        cart.add_to_cart(product("D2", 50)).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&cart.storage().raw().unwrap()).unwrap();
        assert_eq!(raw.as_array().map(Vec::len), Some(2));
        assert_eq!(raw[0]["id"], "D1");
        assert_eq!(raw[0]["quantity"], 1);
        cart.clear_cart().unwrap();
        assert_eq!(cart.storage().raw().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_storage_survives_poisoned_lock() {
        let storage = MemoryCartStorage::new();
        let poisoned = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = storage.value.lock().unwrap();
                panic!("writer crashed");
            })
            .join()
        });
        assert!(poisoned.is_err());
        assert!(storage.value.is_poisoned());

        let mut cart = PersistentCart::open(storage).unwrap();
        cart.add_to_cart(product("D1", 100)).unwrap();
        let stored = cart.storage().read().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "D1");
    }

    #[test]
    fn test_zero_quantity_lines_dropped_on_load() {
        let storage = MemoryCartStorage::with_raw(r#"[{"id":"D1","name":"Toor Dal","price":100,"quantity":0},{"id":"D2","name":"Rice","price":60,"quantity":3}]"#);
        let cart = PersistentCart::open(storage).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.cart().item_count(), 3);
    }
}
