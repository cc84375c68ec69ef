//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Staff auth
//! GET  /login                          - Login page
//! POST /login                          - Login action (rate limited)
//! POST /logout                         - Logout action
//! GET  /api/auth/session               - Current session (JSON)
//! GET  /api/auth/callback?token=       - External sign-in callback
//! GET  /select-restaurant              - Restaurant choice
//! POST /select-restaurant              - Bind restaurant into session
//! GET  /select-unit                    - Unit choice
//! POST /select-unit                    - Bind unit into session
//!
//! # Staff area (behind the route guard)
//! GET  /restaurant/{slug}/dashboard    - Restaurant dashboard
//! GET  /restaurant/{slug}/products     - Product list
//! GET  /manager/{slug}/dashboard       - Unit dashboard
//!
//! # Guests
//! GET  /menu/{slug}?table=N            - Menu page, binds the table
//!
//! # Cart API (JSON, rate limited)
//! GET    /api/cart                     - Current cart
//! DELETE /api/cart                     - Empty the cart
//! POST   /api/cart/items               - Add item
//! PATCH  /api/cart/items/{id}          - Set quantity (<= 0 removes)
//! DELETE /api/cart/items/{id}          - Remove item
//! PUT    /api/cart/guest               - Set guest name/phone
//! PUT    /api/cart/order-type          - Set order type
//! POST   /api/cart/checkout            - Place the order
//! ```

pub mod auth;
pub mod cart;
pub mod menu;
pub mod staff;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::middleware::{api_rate_limiter, login_rate_limiter};
use crate::state::AppState;

/// Create the staff auth routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(login_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::session_info))
        .route("/api/auth/callback", get(auth::callback))
        .route(
            "/select-restaurant",
            get(auth::select_restaurant_page).post(auth::select_restaurant),
        )
        .route(
            "/select-unit",
            get(auth::select_unit_page).post(auth::select_unit),
        )
}

/// Create the staff area routes.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/restaurant/{restaurant_slug}/dashboard",
            get(staff::restaurant_dashboard),
        )
        .route(
            "/restaurant/{restaurant_slug}/products",
            get(staff::restaurant_products),
        )
        .route("/manager/{unit_slug}/dashboard", get(staff::manager_dashboard))
}

/// Create the cart API routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/guest", put(cart::set_guest))
        .route("/order-type", put(cart::set_order_type))
        .route("/checkout", post(cart::checkout))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(staff_routes())
        .route("/menu/{restaurant_slug}", get(menu::show))
        .nest("/api/cart", cart_routes().layer(api_rate_limiter()))
}
