//! Cart aggregate for guest orders.
//!
//! A [`Cart`] is a plain value: handlers load it from the session, apply a
//! [`CartAction`], and write it back. Lines are keyed by product id only, so
//! adding the same product twice merges quantities even when the addons
//! differ. The first write wins for every field except quantity.
//!
//! Quantities and totals saturate instead of overflowing; callers bound
//! quantities with [`MAX_QUANTITY`].
//!
//! Two totals exist on purpose: [`Cart::total`] ignores addons (menu
//! subtotal), [`Cart::total_with_addons`] is what the order confirmation
//! shows and what is sent to the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AddonId, CartItemStatus, ProductId};

/// Largest quantity a guest may order of one product or addon.
pub const MAX_QUANTITY: i64 = 999;

/// An extra attached to a cart line (extra cheese, no onions, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    pub id: AddonId,
    pub name: String,
    pub price: Decimal,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub status: CartItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<Addon>,
}

impl CartItem {
    /// Line total without addons.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Price of one unit including its addons.
    #[must_use]
    pub fn unit_price_with_addons(&self) -> Decimal {
        self.addons
            .iter()
            .map(|addon| addon.price.saturating_mul(Decimal::from(addon.quantity)))
            .fold(self.price, Decimal::saturating_add)
    }
}

/// A mutation applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CartAction {
    Add(CartItem),
    Remove { id: ProductId },
    UpdateQuantity { id: ProductId, quantity: i64 },
    Clear,
}

/// Ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item, merging into an existing line with the same product id.
    pub fn add_item(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => self.items.push(item),
        }
    }

    /// Remove the line for `id`. Removing a missing id is a no-op.
    pub fn remove_item(&mut self, id: &ProductId) {
        self.items.retain(|item| &item.id != id);
    }

    /// Set the quantity of a line as given, without clamping.
    ///
    /// Returns `false` when no line matches `id`. Callers decide what a
    /// quantity of zero or less means.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
        self.items
            .iter_mut()
            .find(|item| &item.id == id)
            .map(|item| item.quantity = quantity)
            .is_some()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply an action, reducer style.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Add(item) => self.add_item(item),
            CartAction::Remove { id } => self.remove_item(&id),
            CartAction::UpdateQuantity { id, quantity } => {
                self.update_quantity(&id, quantity);
            }
            CartAction::Clear => self.clear(),
        }
    }

    /// Sum of `price * quantity` over all lines. Addons are not included.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Sum of `(price + addons) * quantity` over all lines.
    #[must_use]
    pub fn total_with_addons(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| {
                item.unit_price_with_addons()
                    .saturating_mul(Decimal::from(item.quantity))
            })
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0, |count, item| count.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
