//! Guest cart JSON API.
//!
//! Every handler loads the [`GuestOrder`] from the session, applies one
//! change and writes the whole record back in a single insert. Prices come
//! from the backend menu, never from the client.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use comanda_core::{
    Addon, AddonId, CartAction, CartItem, CartItemStatus, GuestIdentity, GuestOrder, MAX_QUANTITY,
    OrderId, OrderStatus, OrderType, ProductId, TableBinding,
};

use crate::backend::{PlaceOrderRequest, Product};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// Longest accepted guest name or observation.
const MAX_TEXT_LEN: usize = 200;

// =============================================================================
// Session Persistence
// =============================================================================

/// Load the guest order. A missing or undecodable record is an empty order.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_guest_order(session: &Session) -> Result<GuestOrder> {
    match session.get::<GuestOrder>(session_keys::GUEST_ORDER).await {
        Ok(order) => Ok(order.unwrap_or_default()),
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!(error = %e, "Discarding undecodable guest order");
            Ok(GuestOrder::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Persist the guest order as one record.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_guest_order(session: &Session, order: &GuestOrder) -> Result<()> {
    session.insert(session_keys::GUEST_ORDER, order).await?;
    Ok(())
}

// =============================================================================
// Request & Response Types
// =============================================================================

/// Cart state returned by every cart endpoint.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub total_with_addons: Decimal,
    pub item_count: i64,
    pub table: Option<TableBinding>,
    pub order_type: OrderType,
    pub guest: Option<GuestIdentity>,
}

impl From<&GuestOrder> for CartView {
    fn from(order: &GuestOrder) -> Self {
        Self {
            items: order.cart.items().to_vec(),
            total: order.cart.total(),
            total_with_addons: order.cart.total_with_addons(),
            item_count: order.cart.item_count(),
            table: order.table.clone(),
            order_type: order.order_type,
            guest: order.guest.clone(),
        }
    }
}

/// Addon picked for a line.
#[derive(Debug, Deserialize)]
pub struct AddonSelection {
    pub id: AddonId,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub addons: Vec<AddonSelection>,
}

/// Body of `PATCH /api/cart/items/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Body of `PUT /api/cart/order-type`.
#[derive(Debug, Deserialize)]
pub struct OrderTypeRequest {
    pub order_type: OrderType,
}

/// Response of a successful checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: Decimal,
    pub cart: CartView,
}

fn clean_text(value: Option<String>, field: &str) -> Result<Option<String>> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(Some(value))
}

fn check_quantity(quantity: i64, field: &str) -> Result<()> {
    if (1..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{field} must be between 1 and {MAX_QUANTITY}"
        )))
    }
}

/// Build a priced cart line from a menu product and the guest's picks.
fn priced_item(product: &Product, request: AddItemRequest) -> Result<CartItem> {
    check_quantity(request.quantity, "quantity")?;

    let addons = request
        .addons
        .into_iter()
        .map(|selection| {
            check_quantity(selection.quantity, "addon quantity")?;
            product
                .addons
                .iter()
                .find(|option| option.id == selection.id)
                .map(|option| Addon {
                    id: option.id.clone(),
                    name: option.name.clone(),
                    price: option.price,
                    quantity: selection.quantity,
                })
                .ok_or_else(|| AppError::BadRequest(format!("unknown addon {}", selection.id)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CartItem {
        id: product.id.clone(),
        name: product.name.clone(),
        price: product.price,
        quantity: request.quantity,
        status: CartItemStatus::Pending,
        observations: clean_text(request.observations, "observations")?,
        addons,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart.
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let order = load_guest_order(&session).await?;
    Ok(Json(CartView::from(&order)))
}

/// Add a menu product to the cart. Adding a product already in the cart
/// increases its quantity.
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let mut order = load_guest_order(&session).await?;
    let table = order.table.as_ref().ok_or_else(|| {
        AppError::BadRequest("open a restaurant menu before adding items".to_string())
    })?;

    let backend = state.backend();
    let mut menu = backend.get_menu(&table.restaurant_id).await?;
    if menu.product(&request.product_id).is_none() {
        // The cached menu may predate the product.
        backend.invalidate_menu(&table.restaurant_id).await;
        menu = backend.get_menu(&table.restaurant_id).await?;
    }
    let product = menu
        .product(&request.product_id)
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;
    let item = priced_item(product, request)?;
    let in_cart = order.cart.get(&item.id).map_or(0, |line| line.quantity);
    check_quantity(in_cart.saturating_add(item.quantity), "quantity")?;

    add_breadcrumb("cart", "Added item", Some(&[("product_id", item.id.as_str())]));
    order.apply(CartAction::Add(item));
    save_guest_order(&session, &order).await?;

    Ok(Json(CartView::from(&order)))
}

/// Set a line's quantity. Zero or less removes the line.
pub async fn update_item(
    session: Session,
    Path(id): Path<ProductId>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    if request.quantity > MAX_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must be at most {MAX_QUANTITY}"
        )));
    }
    let mut order = load_guest_order(&session).await?;
    if order.cart.get(&id).is_none() {
        return Err(AppError::NotFound(format!("cart item {id}")));
    }

    order.apply(CartAction::UpdateQuantity {
        id,
        quantity: request.quantity,
    });
    save_guest_order(&session, &order).await?;

    Ok(Json(CartView::from(&order)))
}

/// Remove a line. Removing an absent line is not an error.
pub async fn remove_item(session: Session, Path(id): Path<ProductId>) -> Result<Json<CartView>> {
    let mut order = load_guest_order(&session).await?;
    order.apply(CartAction::Remove { id });
    save_guest_order(&session, &order).await?;
    Ok(Json(CartView::from(&order)))
}

/// Empty the cart. The table binding is kept.
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let mut order = load_guest_order(&session).await?;
    order.apply(CartAction::Clear);
    save_guest_order(&session, &order).await?;
    Ok(Json(CartView::from(&order)))
}

/// Set who is ordering.
pub async fn set_guest(
    session: Session,
    Json(guest): Json<GuestIdentity>,
) -> Result<Json<CartView>> {
    let name = clean_text(Some(guest.name), "name")?
        .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?;
    let phone = clean_text(guest.phone, "phone")?;

    let mut order = load_guest_order(&session).await?;
    order.guest = Some(GuestIdentity { name, phone });
    save_guest_order(&session, &order).await?;

    Ok(Json(CartView::from(&order)))
}

/// Set how the order is delivered.
pub async fn set_order_type(
    session: Session,
    Json(request): Json<OrderTypeRequest>,
) -> Result<Json<CartView>> {
    let mut order = load_guest_order(&session).await?;
    order.order_type = request.order_type;
    save_guest_order(&session, &order).await?;
    Ok(Json(CartView::from(&order)))
}

/// Send the cart to the backend as an order.
#[instrument(skip(state, session))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutResponse>> {
    let mut order = load_guest_order(&session).await?;
    if order.cart.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }
    let request = PlaceOrderRequest::from_guest_order(&order).ok_or_else(|| {
        AppError::BadRequest("open a restaurant menu before checking out".to_string())
    })?;

    let placed = state.backend().place_order(&request).await?;
    tracing::info!(order_id = %placed.id, total = %placed.total, "Order placed");

    order.reset_after_checkout();
    save_guest_order(&session, &order).await?;

    Ok(Json(CheckoutResponse {
        order_id: placed.id,
        status: placed.status,
        total: placed.total,
        cart: CartView::from(&order),
    }))
}
