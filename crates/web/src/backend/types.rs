//! Wire types for the REST backend.
//!
//! The backend speaks camelCase JSON. These types mirror its payloads; the
//! conversions into session and view types live next to them.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use comanda_core::{
    Addon, CartItem, GuestOrder, OrderId, OrderStatus, OrderType, ProductId, PromotionId,
    RestaurantId, StaffRole, UnitId, UserId,
};

use crate::models::StaffSession;

/// Longest token lifetime honored; longer values are capped.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Expiry of a token that lives `expires_in` seconds from `now`, clamped to
/// `0..=MAX_TOKEN_TTL_SECONDS`.
#[must_use]
pub fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    Duration::try_seconds(expires_in.clamp(0, MAX_TOKEN_TTL_SECONDS))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(now)
}

// =============================================================================
// Auth
// =============================================================================

/// Login request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub user: BackendUser,
}

/// User profile with its restaurant/unit claims.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    #[serde(default)]
    pub restaurant_id: Option<RestaurantId>,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

impl BackendUser {
    /// Build the session record for this user.
    #[must_use]
    pub fn into_session(self, access_token: String, expires_at: DateTime<Utc>) -> StaffSession {
        StaffSession {
            user_id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            restaurant_id: self.restaurant_id,
            restaurant_name: self.restaurant_name,
            unit_id: self.unit_id,
            unit_name: self.unit_name,
            access_token,
            expires_at,
        }
    }
}

impl LoginResponse {
    /// Build the session record, computing expiry from `now`.
    #[must_use]
    pub fn into_session(self, now: DateTime<Utc>) -> StaffSession {
        let expires_at = token_expiry(now, self.expires_in);
        self.user.into_session(self.access_token, expires_at)
    }
}

// =============================================================================
// Restaurants & Units
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSummary {
    pub id: RestaurantId,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub id: UnitId,
    pub name: String,
    pub restaurant_id: RestaurantId,
}

// =============================================================================
// Menu
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonOption {
    pub id: comanda_core::AddonId,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "available")]
    pub available: bool,
    #[serde(default)]
    pub addons: Vec<AddonOption>,
}

const fn available() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: PromotionId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
}

/// A restaurant's public menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub restaurant: RestaurantSummary,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
}

impl Menu {
    /// Look up an orderable product.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id && p.available)
    }

    /// Products grouped by category, in menu order. Uncategorized products
    /// go under "Other".
    #[must_use]
    pub fn categories(&self) -> Vec<(String, Vec<&Product>)> {
        let mut groups: Vec<(String, Vec<&Product>)> = Vec::new();
        for product in self.products.iter().filter(|p| p.available) {
            let category = product.category.as_deref().unwrap_or("Other");
            match groups.iter_mut().find(|(name, _)| name == category) {
                Some((_, items)) => items.push(product),
                None => groups.push((category.to_string(), vec![product])),
            }
        }
        groups
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<Addon>,
}

impl From<&CartItem> for OrderLineRequest {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.id.clone(),
            quantity: item.quantity,
            observations: item.observations.clone(),
            addons: item.addons.clone(),
        }
    }
}

/// Order placement payload built from a guest order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub restaurant_id: RestaurantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub items: Vec<OrderLineRequest>,
    pub total: Decimal,
}

impl PlaceOrderRequest {
    /// Build from a guest order. Returns `None` without a table binding.
    #[must_use]
    pub fn from_guest_order(order: &GuestOrder) -> Option<Self> {
        let table = order.table.as_ref()?;
        Some(Self {
            restaurant_id: table.restaurant_id.clone(),
            table_number: table.table_number,
            order_type: order.order_type,
            customer_name: order.guest.as_ref().map(|g| g.name.clone()),
            customer_phone: order.guest.as_ref().and_then(|g| g.phone.clone()),
            items: order.cart.items().iter().map(OrderLineRequest::from).collect(),
            total: order.cart.total_with_addons(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    #[serde(default)]
    pub table_number: Option<u32>,
    #[serde(default)]
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub customer_name: Option<String>,
}
