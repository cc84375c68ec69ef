//! Guest order aggregate.
//!
//! Everything a guest accumulates between scanning the QR code and placing
//! the order lives in one [`GuestOrder`] value: the cart, the table binding,
//! the order type and the guest's name. It is persisted as a single record so
//! the cart can never drift from the table it belongs to.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartAction};
use crate::slug;
use crate::types::{OrderType, RestaurantId};

/// The restaurant and table a guest scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBinding {
    pub restaurant_id: RestaurantId,
    /// Slug the guest arrived with, kept for building links back to the menu.
    pub restaurant_slug: String,
    pub table_number: Option<u32>,
}

impl TableBinding {
    /// Bind from a menu slug. Returns `None` when the slug carries no id.
    #[must_use]
    pub fn from_slug(restaurant_slug: &str, table_number: Option<u32>) -> Option<Self> {
        let id = slug::decode_id(restaurant_slug);
        if id.is_empty() {
            return None;
        }

        Some(Self {
            restaurant_id: RestaurantId::new(id),
            restaurant_slug: restaurant_slug.to_string(),
            table_number,
        })
    }
}

/// Who is ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Cart, table binding, order type and guest identity as one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestOrder {
    #[serde(default)]
    pub table: Option<TableBinding>,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub guest: Option<GuestIdentity>,
    #[serde(default)]
    pub cart: Cart,
}

impl GuestOrder {
    /// Bind to a table. Switching restaurants empties the cart, since its
    /// products belong to the previous menu.
    pub fn bind_table(&mut self, binding: TableBinding) {
        let same_restaurant = self
            .table
            .as_ref()
            .is_some_and(|current| current.restaurant_id == binding.restaurant_id);
        if !same_restaurant {
            self.cart.clear();
        }
        self.table = Some(binding);
    }

    /// Apply a cart action with the call-site floor: a quantity update to
    /// zero or below removes the line instead.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::UpdateQuantity { id, quantity } if quantity <= 0 => {
                self.cart.apply(CartAction::Remove { id });
            }
            other => self.cart.apply(other),
        }
    }

    /// Reset after a successful checkout. The table binding and guest are
    /// kept so the guest can order another round.
    pub fn reset_after_checkout(&mut self) {
        self.cart.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::CartItem;
    use crate::types::{CartItemStatus, ProductId};

    fn item(id: &str) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: id.to_string(),
            price: Decimal::from(8),
            quantity: 1,
            status: CartItemStatus::Pending,
            observations: None,
            addons: Vec::new(),
        }
    }

    #[test]
    fn test_binding_from_slug() {
        let binding = TableBinding::from_slug("joes-grill-abc123", Some(7));
        assert_eq!(
            binding.as_ref().map(|b| b.restaurant_id.as_str()),
            Some("abc123")
        );
        assert!(TableBinding::from_slug("undefined", None).is_none());
    }

    #[test]
    fn test_switching_restaurant_clears_cart() {
        let mut order = GuestOrder::default();
        order.bind_table(TableBinding::from_slug("a-r1", Some(1)).unwrap());
        order.apply(CartAction::Add(item("p1")));

        order.bind_table(TableBinding::from_slug("a-r1", Some(2)).unwrap());
        assert!(!order.cart.is_empty());

        order.bind_table(TableBinding::from_slug("b-r2", Some(2)).unwrap());
        assert!(order.cart.is_empty());
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut order = GuestOrder::default();
        order.apply(CartAction::Add(item("p1")));
        order.apply(CartAction::UpdateQuantity {
            id: ProductId::new("p1"),
            quantity: 0,
        });
        assert!(order.cart.is_empty());
    }

    #[test]
    fn test_partial_record_fills_defaults() {
        let order: GuestOrder = serde_json::from_str("{}").unwrap();
        assert!(order.table.is_none());
        assert_eq!(order.order_type, OrderType::DineIn);
        assert!(order.cart.is_empty());
    }
}
