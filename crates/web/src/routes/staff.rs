//! Staff area pages.
//!
//! Only reachable through the route guard, which has already checked the
//! role and canonicalized the slug. Handlers still extract the session
//! themselves for the backend token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use comanda_core::{RestaurantId, UnitId, slug};

use crate::backend::{OrderSummary, Product};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Dashboard order row.
pub struct OrderRow {
    pub id: String,
    pub table: String,
    pub customer: String,
    pub status: &'static str,
    pub total: String,
    pub created_at: String,
}

impl From<OrderSummary> for OrderRow {
    fn from(order: OrderSummary) -> Self {
        Self {
            id: order.id.into_inner(),
            table: order
                .table_number
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            customer: order.customer_name.unwrap_or_default(),
            status: order.status.label(),
            total: order.total.to_string(),
            created_at: order.created_at.format("%d/%m %H:%M").to_string(),
        }
    }
}

/// Dashboard template, shared by the restaurant and manager areas.
#[derive(Template, WebTemplate)]
#[template(path = "staff/dashboard.html")]
pub struct DashboardTemplate {
    pub staff_name: String,
    pub area_title: String,
    pub area_slug: String,
    pub show_products_link: bool,
    pub orders: Vec<OrderRow>,
}

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "staff/products.html")]
pub struct ProductsTemplate {
    pub staff_name: String,
    pub area_title: String,
    pub area_slug: String,
    pub products: Vec<Product>,
}

/// Id carried by a slug segment.
fn slug_id(segment: &str) -> Result<&str> {
    match slug::decode_id(segment) {
        "" => Err(AppError::NotFound(format!("'{segment}'"))),
        id => Ok(id),
    }
}

/// Title for an area page: the session's name when it matches the slug,
/// otherwise the best guess from the slug.
fn area_title(segment: &str, id: &str, claim: Option<(&str, &str)>) -> String {
    match claim {
        Some((claim_id, name)) if claim_id == id => name.to_string(),
        _ => slug::decode_name(segment),
    }
}

/// Restaurant dashboard with recent orders.
#[instrument(skip(state, staff), fields(user_id = %staff.user_id))]
pub async fn restaurant_dashboard(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(restaurant_slug): Path<String>,
) -> Result<impl IntoResponse> {
    let restaurant_id = RestaurantId::new(slug_id(&restaurant_slug)?);
    let orders = state
        .backend()
        .list_orders(&staff.access_token, Some(&restaurant_id), None)
        .await?;

    let claim = staff
        .restaurant_id
        .as_ref()
        .map(RestaurantId::as_str)
        .zip(staff.restaurant_name.as_deref());

    Ok(DashboardTemplate {
        area_title: area_title(&restaurant_slug, restaurant_id.as_str(), claim),
        staff_name: staff.name,
        area_slug: format!("/restaurant/{restaurant_slug}"),
        show_products_link: true,
        orders: orders.into_iter().map(OrderRow::from).collect(),
    })
}

/// Unit dashboard with recent orders.
#[instrument(skip(state, staff), fields(user_id = %staff.user_id))]
pub async fn manager_dashboard(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(unit_slug): Path<String>,
) -> Result<impl IntoResponse> {
    let unit_id = UnitId::new(slug_id(&unit_slug)?);
    let orders = state
        .backend()
        .list_orders(
            &staff.access_token,
            staff.restaurant_id.as_ref(),
            Some(&unit_id),
        )
        .await?;

    let claim = staff
        .unit_id
        .as_ref()
        .map(UnitId::as_str)
        .zip(staff.unit_name.as_deref());

    Ok(DashboardTemplate {
        area_title: area_title(&unit_slug, unit_id.as_str(), claim),
        staff_name: staff.name,
        area_slug: format!("/manager/{unit_slug}"),
        show_products_link: false,
        orders: orders.into_iter().map(OrderRow::from).collect(),
    })
}

/// All products of a restaurant, including unavailable ones.
#[instrument(skip(state, staff), fields(user_id = %staff.user_id))]
pub async fn restaurant_products(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(restaurant_slug): Path<String>,
) -> Result<impl IntoResponse> {
    let restaurant_id = RestaurantId::new(slug_id(&restaurant_slug)?);
    let products = state
        .backend()
        .list_products(&staff.access_token, &restaurant_id)
        .await?;

    let claim = staff
        .restaurant_id
        .as_ref()
        .map(RestaurantId::as_str)
        .zip(staff.restaurant_name.as_deref());

    Ok(ProductsTemplate {
        area_title: area_title(&restaurant_slug, restaurant_id.as_str(), claim),
        staff_name: staff.name,
        area_slug: format!("/restaurant/{restaurant_slug}"),
        products,
    })
}
