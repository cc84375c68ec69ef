//! Guest menu page.
//!
//! `GET /menu/{restaurant_slug}?table=N` is where a table's QR code points.
//! Opening it binds the guest order to that restaurant and table.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comanda_core::{TableBinding, slug};

use crate::backend::{Product, Promotion};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::cart::{load_guest_order, save_guest_order};
use crate::state::AppState;

/// Query parameters of the menu page.
#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub table: Option<u32>,
}

/// Products of one category.
pub struct CategoryView {
    pub name: String,
    pub products: Vec<Product>,
}

/// Menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/show.html")]
pub struct MenuTemplate {
    pub restaurant_name: String,
    pub table_number: Option<u32>,
    pub categories: Vec<CategoryView>,
    pub promotions: Vec<Promotion>,
    pub cart_count: i64,
}

/// Display a restaurant's menu and bind the guest to the table.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(restaurant_slug): Path<String>,
    Query(query): Query<MenuQuery>,
) -> Result<impl IntoResponse> {
    if slug::is_placeholder_segment(&restaurant_slug) {
        return Err(AppError::NotFound("restaurant".to_string()));
    }
    let binding = TableBinding::from_slug(&restaurant_slug, query.table)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_slug}")))?;

    let menu = state.backend().get_menu(&binding.restaurant_id).await?;

    let mut order = load_guest_order(&session).await?;
    order.bind_table(binding);
    save_guest_order(&session, &order).await?;

    let categories = menu
        .categories()
        .into_iter()
        .map(|(name, products)| CategoryView {
            name,
            products: products.into_iter().cloned().collect(),
        })
        .collect();

    Ok(MenuTemplate {
        restaurant_name: menu.restaurant.name.clone(),
        table_number: query.table,
        categories,
        promotions: menu.promotions.clone(),
        cart_count: order.cart.item_count(),
    })
}
