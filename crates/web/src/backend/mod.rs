//! REST client for the restaurant backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, restaurants, menus and
//!   orders. Nothing is synced locally.
//! - Public menus are cached in memory via `moka` (TTL from config).
//! - Staff calls carry the session's bearer token; guest calls are anonymous.
//! - Only the login call has a timeout, so a slow backend cannot hang the
//!   login form.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use comanda_core::{RestaurantId, UnitId};

use crate::config::BackendConfig;

pub use types::*;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status not covered by a more specific variant.
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Bad credentials or an expired/rejected token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BackendError {
    /// Whether the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Client for the restaurant backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    api_url: String,
    login_timeout: Duration,
    menus: Cache<RestaurantId, Arc<Menu>>,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let menus = Cache::builder()
            .max_capacity(500)
            .time_to_live(config.menu_cache_ttl)
            .build();

        Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.clone(),
                login_timeout: config.login_timeout,
                menus,
            }),
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.api_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode a JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let snippet = body.chars().take(500).collect::<String>();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
                StatusCode::NOT_FOUND => BackendError::NotFound(snippet),
                _ => {
                    tracing::error!(
                        status = %status,
                        body = %snippet,
                        "Backend returned non-success status"
                    );
                    BackendError::Status {
                        status: status.as_u16(),
                        body: snippet,
                    }
                }
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a token and user profile.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] for bad credentials and an
    /// `Http` timeout error when the backend does not answer in time.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let request = self
            .request(Method::POST, "/auth/login", None)
            .timeout(self.inner.login_timeout)
            .json(&LoginRequest { email, password });
        self.send(request).await
    }

    /// Fetch the user behind a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<BackendUser, BackendError> {
        self.send(self.request(Method::GET, "/auth/me", Some(token)))
            .await
    }

    // =========================================================================
    // Restaurants
    // =========================================================================

    /// List restaurants visible to the token's user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_restaurants(
        &self,
        token: &str,
    ) -> Result<Vec<RestaurantSummary>, BackendError> {
        self.send(self.request(Method::GET, "/restaurants", Some(token)))
            .await
    }

    /// List units of a restaurant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_units(
        &self,
        token: &str,
        restaurant_id: &RestaurantId,
    ) -> Result<Vec<UnitSummary>, BackendError> {
        let path = format!("/restaurants/{restaurant_id}/units");
        self.send(self.request(Method::GET, &path, Some(token)))
            .await
    }

    /// Public menu of a restaurant, cached.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for unknown restaurants.
    #[instrument(skip(self))]
    pub async fn get_menu(&self, restaurant_id: &RestaurantId) -> Result<Arc<Menu>, BackendError> {
        if let Some(menu) = self.inner.menus.get(restaurant_id).await {
            debug!("Cache hit for menu");
            return Ok(menu);
        }

        let path = format!("/restaurants/{restaurant_id}/menu");
        let menu: Menu = self.send(self.request(Method::GET, &path, None)).await?;
        let menu = Arc::new(menu);
        self.inner
            .menus
            .insert(restaurant_id.clone(), Arc::clone(&menu))
            .await;
        Ok(menu)
    }

    /// Full product list for staff, including unavailable products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_products(
        &self,
        token: &str,
        restaurant_id: &RestaurantId,
    ) -> Result<Vec<Product>, BackendError> {
        let path = format!("/restaurants/{restaurant_id}/products");
        self.send(self.request(Method::GET, &path, Some(token)))
            .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Recent orders of a restaurant, optionally narrowed to one unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_orders(
        &self,
        token: &str,
        restaurant_id: Option<&RestaurantId>,
        unit_id: Option<&UnitId>,
    ) -> Result<Vec<OrderSummary>, BackendError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            restaurant_id: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            unit_id: Option<&'a str>,
        }

        let request = self
            .request(Method::GET, "/orders", Some(token))
            .query(&Query {
                restaurant_id: restaurant_id.map(RestaurantId::as_str),
                unit_id: unit_id.map(UnitId::as_str),
            });
        self.send(request).await
    }

    /// Place a guest order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order.
    #[instrument(skip(self, order), fields(restaurant_id = %order.restaurant_id, items = order.items.len()))]
    pub async fn place_order(&self, order: &PlaceOrderRequest) -> Result<OrderSummary, BackendError> {
        let request = self.request(Method::POST, "/orders", None).json(order);
        self.send(request).await
    }

    /// Drop a cached menu.
    pub async fn invalidate_menu(&self, restaurant_id: &RestaurantId) {
        self.inner.menus.invalidate(restaurant_id).await;
    }
}
