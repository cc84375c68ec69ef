//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Route guard (staff area, login, `/api/auth/*`)
//!
//! Rate limiters are attached to individual routes.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod route_guard;
pub mod security_headers;
pub mod session;

pub use auth::{RequireStaff, clear_staff_session, set_staff_session};
pub use rate_limit::{api_rate_limiter, login_rate_limiter};
pub use request_id::request_id_middleware;
pub use route_guard::route_guard_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
