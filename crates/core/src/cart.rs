//! Client-local shopping cart persisted in the key-value store

use crate::error::{CoreError, CoreResult};
use crate::storage::{KeyValueStore, keys};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Flat delivery charge added to every non-empty order
pub const DEFAULT_DELIVERY_FEE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// One cart line: a product snapshot plus the requested quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product id
    pub id: i64,
    pub name: String,
    /// Unit price at the time the product was added
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    /// Remaining product fields (images, category, ...) kept for display
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CartItem {
    pub fn new(id: i64, name: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            quantity,
            details: Map::new(),
        }
    }

    /// Attach extra product fields
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// `price * quantity`
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Cart operations over a shared key-value store
///
/// Every call reads the persisted snapshot, so a cart cleared elsewhere
/// (for example by logout) is observed immediately. Every mutation writes
/// the full snapshot back.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    delivery_fee: Decimal,
}

impl CartStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            delivery_fee: DEFAULT_DELIVERY_FEE,
        }
    }

    /// Override the flat delivery fee
    #[must_use]
    pub fn with_delivery_fee(mut self, fee: Decimal) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub const fn delivery_fee(&self) -> Decimal {
        self.delivery_fee
    }

    /// Current cart lines. An unreadable snapshot is treated as an empty cart.
    pub fn items(&self) -> CoreResult<Vec<CartItem>> {
        let Some(raw) = self.store.get(keys::CART)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("Discarding unreadable cart snapshot: {e}");
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, items: &[CartItem]) -> CoreResult<()> {
        let snapshot = serde_json::to_string(items)?;
        self.store.set(keys::CART, &snapshot)?;
        debug!(lines = items.len(), "Persisted cart");
        Ok(())
    }

    /// Add a product, merging with an existing line for the same product id
    pub fn add_item(&self, item: CartItem) -> CoreResult<Vec<CartItem>> {
        if item.quantity == 0 {
            return Err(CoreError::validation("quantity", "must be at least 1"));
        }
        let mut items = self.items()?;
        if let Some(existing) = items.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            items.push(item);
        }
        self.persist(&items)?;
        Ok(items)
    }

    /// Set the quantity of a line; zero removes it. Unknown ids are ignored.
    pub fn update_quantity(&self, product_id: i64, quantity: u32) -> CoreResult<Vec<CartItem>> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        let mut items = self.items()?;
        if let Some(line) = items.iter_mut().find(|line| line.id == product_id) {
            line.quantity = quantity;
            self.persist(&items)?;
        }
        Ok(items)
    }

    /// Remove a line entirely
    pub fn remove_item(&self, product_id: i64) -> CoreResult<Vec<CartItem>> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|line| line.id != product_id);
        if items.len() != before {
            self.persist(&items)?;
        }
        Ok(items)
    }

    /// Empty the cart and delete the persisted snapshot
    pub fn clear(&self) -> CoreResult<()> {
        self.store.remove(keys::CART)
    }

    /// Quantity currently in the cart for a product, 0 if absent
    pub fn quantity_of(&self, product_id: i64) -> CoreResult<u32> {
        Ok(self
            .items()?
            .iter()
            .find(|line| line.id == product_id)
            .map_or(0, |line| line.quantity))
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> CoreResult<u32> {
        Ok(self.items()?.iter().map(|line| line.quantity).sum())
    }

    /// Sum of `price * quantity` over all lines
    pub fn subtotal(&self) -> CoreResult<Decimal> {
        Ok(self.items()?.iter().map(CartItem::line_total).sum())
    }

    /// Subtotal plus delivery; an empty cart totals zero
    pub fn total(&self) -> CoreResult<Decimal> {
        let items = self.items()?;
        if items.is_empty() {
            return Ok(Decimal::ZERO);
        }
        let subtotal: Decimal = items.iter().map(CartItem::line_total).sum();
        Ok(subtotal + self.delivery_fee)
    }
}
