//! Integration tests for Comanda.
//!
//! These run against a live `comanda-web` server with its session store
//! migrated. They are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! comanda migrate
//! cargo run -p comanda-web &
//! cargo test -p comanda-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `COMANDA_TEST_BASE_URL` - server under test (default `http://localhost:3000`)
//! - `COMANDA_TEST_RESTAURANT_SLUG` - a restaurant slug known to the backend,
//!   used by the menu and cart tests

use reqwest::Client;
use reqwest::redirect::Policy;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("COMANDA_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Restaurant slug known to the backend, when configured.
#[must_use]
pub fn restaurant_slug() -> Option<String> {
    std::env::var("COMANDA_TEST_RESTAURANT_SLUG").ok()
}

/// Client that keeps cookies and does not follow redirects, so tests can
/// assert on each hop.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
}
