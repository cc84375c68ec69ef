//! Route guard for the staff area.
//!
//! Runs on `/restaurant/*`, `/manager/*`, `/login` and `/api/auth/*`. Every
//! other path passes straight through without touching the counter cookie.
//!
//! Each guarded request gets one [`Decision`]: let it through, or redirect
//! it. Redirects bump a short-lived `redirect_count` cookie; once the browser
//! comes back with a count of [`MAX_REDIRECTS`] the guard stops redirecting
//! and lets the request through, so a bad session can never trap a browser
//! in a redirect loop.
//!
//! The decision itself is [`decide`], a pure function of the path, the
//! counter, the session and the clock. The middleware only gathers those
//! inputs and turns the decision into a response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tower_sessions::Session;
use tower_sessions::cookie::{Cookie, time::Duration};

use comanda_core::slug;

use crate::models::{SELECT_RESTAURANT_PATH, SELECT_UNIT_PATH, StaffSession, session_keys};

/// Cookie carrying the number of consecutive guard redirects.
pub const REDIRECT_COUNT_COOKIE: &str = "redirect_count";

/// Counter value at which the guard gives up redirecting.
pub const MAX_REDIRECTS: u32 = 2;

/// Lifetime of the counter cookie.
const COUNTER_MAX_AGE_SECONDS: i64 = 5;

pub const LOGIN_PATH: &str = "/login";

/// Segment appended when a canonical redirect has nothing after the slug.
const DEFAULT_AREA_PAGE: &str = "dashboard";

/// Staff area a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// `/restaurant/{restaurant_slug}/...`
    Restaurant,
    /// `/manager/{unit_slug}/...`
    Manager,
}

impl Area {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Manager => "manager",
        }
    }
}

/// What kind of path a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// `/api/auth/*`: always reachable.
    ApiAuth,
    /// `/restaurant/*` or `/manager/*`.
    AdminArea(Area),
    /// Exactly `/login`.
    Login,
    /// Not guarded.
    Other,
}

/// Classify a request path.
#[must_use]
pub fn classify(path: &str) -> PathClass {
    if path == LOGIN_PATH {
        return PathClass::Login;
    }
    if path == "/api/auth" || path.starts_with("/api/auth/") {
        return PathClass::ApiAuth;
    }
    for area in [Area::Restaurant, Area::Manager] {
        let rest = path
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix(area.prefix()));
        if matches!(rest, Some(rest) if rest.is_empty() || rest.starts_with('/')) {
            return PathClass::AdminArea(area);
        }
    }
    PathClass::Other
}

/// Outcome of guarding one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the request through. `Some(n)` rewrites the counter cookie.
    Allow { counter: Option<u32> },
    /// Redirect and store `counter` in the counter cookie.
    Redirect { location: String, counter: u32 },
}

impl Decision {
    const fn allow_and_reset() -> Self {
        Self::Allow { counter: Some(0) }
    }

    fn redirect(location: impl Into<String>, counter: u32) -> Self {
        Self::Redirect {
            location: location.into(),
            counter: counter.saturating_add(1),
        }
    }
}

/// Errors while gathering guard inputs. All of them fail closed.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("cookie header is not valid UTF-8")]
    CookieHeader,

    #[error("session layer missing from the request")]
    MissingSession,

    #[error("session store failed: {0}")]
    SessionStore(tower_sessions::session::Error),

    #[error("redirect location is not a valid header value: {0}")]
    Location(String),
}

/// Decide what to do with a request.
///
/// `session` is the stored staff session, if any; expiry is checked against
/// `now`.
#[must_use]
pub fn decide(
    path: &str,
    counter: u32,
    session: Option<&StaffSession>,
    now: DateTime<Utc>,
) -> Decision {
    let class = classify(path);
    if class == PathClass::Other {
        return Decision::Allow { counter: None };
    }

    if counter >= MAX_REDIRECTS {
        tracing::warn!(path, counter, "Redirect loop detected, allowing request");
        return Decision::allow_and_reset();
    }

    let session = session.filter(|s| !s.is_expired(now));

    match class {
        PathClass::ApiAuth | PathClass::Other => Decision::Allow { counter: None },
        PathClass::Login => session.map_or_else(Decision::allow_and_reset, |s| {
            Decision::redirect(s.home_path(), counter)
        }),
        PathClass::AdminArea(area) => match session {
            Some(s) if s.role.can_manage() => {
                canonical_location(path, area, s).map_or_else(Decision::allow_and_reset, |to| {
                    Decision::redirect(to, counter)
                })
            }
            _ => Decision::redirect(LOGIN_PATH, counter),
        },
    }
}

/// Where an area path should go instead, or `None` when its identifying
/// segment is usable.
fn canonical_location(path: &str, area: Area, session: &StaffSession) -> Option<String> {
    let mut segments = path.trim_start_matches('/').splitn(3, '/').skip(1);
    let identifying = segments.next().unwrap_or("");
    if !needs_canonical_slug(identifying) {
        return None;
    }

    let rest = segments.next().unwrap_or("").trim_matches('/');
    let rest = if rest.is_empty() {
        DEFAULT_AREA_PAGE
    } else {
        rest
    };

    let (slug, fallback) = match area {
        Area::Restaurant => (session.restaurant_slug(), SELECT_RESTAURANT_PATH),
        Area::Manager => (session.unit_slug(), SELECT_UNIT_PATH),
    };

    Some(slug.map_or_else(
        || fallback.to_string(),
        |slug| format!("/{}/{slug}/{rest}", area.prefix()),
    ))
}

fn needs_canonical_slug(segment: &str) -> bool {
    slug::is_placeholder_segment(segment) || slug::decode_id(segment).is_empty()
}

/// Read the counter from the request cookies. Missing or malformed values
/// count as 0.
///
/// # Errors
///
/// Returns [`GuardError::CookieHeader`] when a cookie header is not UTF-8.
pub fn read_counter(headers: &HeaderMap) -> Result<u32, GuardError> {
    let mut counter = 0;
    for value in headers.get_all(header::COOKIE) {
        let value = value.to_str().map_err(|_| GuardError::CookieHeader)?;
        if let Some(cookie) = Cookie::split_parse(value)
            .filter_map(Result::ok)
            .find(|c| c.name() == REDIRECT_COUNT_COOKIE)
        {
            counter = cookie.value().trim().parse().unwrap_or(0);
        }
    }
    Ok(counter)
}

/// `Set-Cookie` value for the counter.
#[must_use]
pub fn counter_cookie(counter: u32) -> String {
    Cookie::build((REDIRECT_COUNT_COOKIE, counter.to_string()))
        .path("/")
        .max_age(Duration::seconds(COUNTER_MAX_AGE_SECONDS))
        .build()
        .to_string()
}

fn set_counter(response: &mut Response, counter: u32) {
    if let Ok(value) = HeaderValue::from_str(&counter_cookie(counter)) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

fn redirect_response(location: &str, counter: u32) -> Result<Response, GuardError> {
    let location =
        HeaderValue::from_str(location).map_err(|_| GuardError::Location(location.to_string()))?;
    let mut response = (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response();
    set_counter(&mut response, counter);
    Ok(response)
}

fn login_redirect(counter: u32) -> Response {
    let mut response = (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, HeaderValue::from_static(LOGIN_PATH))],
    )
        .into_response();
    set_counter(&mut response, counter);
    response
}

/// Load the staff session. An undecodable record counts as no session.
async fn load_staff_session(session: Option<Session>) -> Result<Option<StaffSession>, GuardError> {
    let session = session.ok_or(GuardError::MissingSession)?;

    match session.get::<StaffSession>(session_keys::STAFF_SESSION).await {
        Ok(staff) => Ok(staff),
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!(error = %e, "Discarding undecodable staff session");
            Ok(None)
        }
        Err(e) => Err(GuardError::SessionStore(e)),
    }
}

async fn evaluate(session: Option<Session>, path: &str, counter: u32) -> Result<Decision, GuardError> {
    let staff = if classify(path) == PathClass::ApiAuth {
        None
    } else {
        load_staff_session(session).await?
    };
    Ok(decide(path, counter, staff.as_ref(), Utc::now()))
}

/// Guard middleware. Must run inside the session layer.
pub async fn route_guard_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if classify(&path) == PathClass::Other {
        return next.run(request).await;
    }

    let counter = match read_counter(request.headers()) {
        Ok(counter) => counter,
        Err(e) => {
            tracing::error!(error = %e, path, "Route guard failed, redirecting to login");
            return login_redirect(1);
        }
    };

    // At the limit the session store is not consulted at all, so a failing
    // store cannot keep the loop going.
    let decision = if counter >= MAX_REDIRECTS {
        decide(&path, counter, None, Utc::now())
    } else {
        let session = request.extensions().get::<Session>().cloned();
        match evaluate(session, &path, counter).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, path, "Route guard failed, redirecting to login");
                Decision::redirect(LOGIN_PATH, counter)
            }
        }
    };

    match decision {
        Decision::Allow { counter } => {
            let mut response = next.run(request).await;
            if let Some(counter) = counter {
                set_counter(&mut response, counter);
            }
            response
        }
        Decision::Redirect { location, counter } => {
            tracing::debug!(path, %location, counter, "Route guard redirect");
            redirect_response(&location, counter).unwrap_or_else(|e| {
                tracing::error!(error = %e, path, "Route guard failed, redirecting to login");
                login_redirect(counter)
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        middleware,
        routing::{get, post},
    };
    use chrono::Duration as ChronoDuration;
    use tower::ServiceExt;
    use tower_sessions::session::{Id, Record};
    use tower_sessions::session_store::{self, SessionStore};
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::models::session::fixtures::{admin, attendant, manager};

    fn redirect_to(location: &str, counter: u32) -> Decision {
        Decision::Redirect {
            location: location.to_string(),
            counter,
        }
    }

    // =========================================================================
    // classify
    // =========================================================================

    #[test]
    fn test_classify() {
        assert_eq!(classify("/api/auth/callback"), PathClass::ApiAuth);
        assert_eq!(classify("/api/auth/session"), PathClass::ApiAuth);
        assert_eq!(classify("/login"), PathClass::Login);
        assert_eq!(
            classify("/restaurant/x-1/dashboard"),
            PathClass::AdminArea(Area::Restaurant)
        );
        assert_eq!(classify("/restaurant"), PathClass::AdminArea(Area::Restaurant));
        assert_eq!(classify("/manager/"), PathClass::AdminArea(Area::Manager));
        assert_eq!(classify("/restaurants"), PathClass::Other);
        assert_eq!(classify("/login/extra"), PathClass::Other);
        assert_eq!(classify("/menu/joes-grill-abc123"), PathClass::Other);
        assert_eq!(classify("/api/cart"), PathClass::Other);
    }

    // =========================================================================
    // decide
    // =========================================================================

    #[test]
    fn test_loop_breaker_allows_regardless_of_session() {
        let now = Utc::now();
        assert_eq!(
            decide("/restaurant/any-slug/dashboard", 2, None, now),
            Decision::Allow { counter: Some(0) }
        );
        assert_eq!(
            decide("/login", 5, Some(&admin()), now),
            Decision::Allow { counter: Some(0) }
        );
    }

    #[test]
    fn test_api_auth_always_allowed_without_counter_change() {
        let now = Utc::now();
        for counter in [0, 1] {
            assert_eq!(
                decide("/api/auth/callback", counter, None, now),
                Decision::Allow { counter: None }
            );
            assert_eq!(
                decide("/api/auth/callback", counter, Some(&admin()), now),
                Decision::Allow { counter: None }
            );
        }
    }

    #[test]
    fn test_unguarded_paths_untouched() {
        assert_eq!(
            decide("/menu/joes-grill-abc123", 1, None, Utc::now()),
            Decision::Allow { counter: None }
        );
    }

    #[test]
    fn test_missing_session_redirects_to_login() {
        assert_eq!(
            decide("/restaurant/any-slug/dashboard", 0, None, Utc::now()),
            redirect_to("/login", 1)
        );
    }

    #[test]
    fn test_expired_session_redirects_to_login() {
        let session = admin();
        let later = session.expires_at + ChronoDuration::seconds(1);
        assert_eq!(
            decide("/restaurant/joes-grill-abc123/dashboard", 1, Some(&session), later),
            redirect_to("/login", 2)
        );
    }

    #[test]
    fn test_attendant_cannot_enter_admin_area() {
        assert_eq!(
            decide("/manager/centro-u77/dashboard", 0, Some(&attendant()), Utc::now()),
            redirect_to("/login", 1)
        );
    }

    #[test]
    fn test_placeholder_segment_redirects_to_canonical() {
        assert_eq!(
            decide("/restaurant/undefined/dashboard", 0, Some(&admin()), Utc::now()),
            redirect_to("/restaurant/joes-grill-abc123/dashboard", 1)
        );
        assert_eq!(
            decide("/restaurant/null/products", 0, Some(&admin()), Utc::now()),
            redirect_to("/restaurant/joes-grill-abc123/products", 1)
        );
    }

    #[test]
    fn test_missing_segment_defaults_to_dashboard() {
        let now = Utc::now();
        assert_eq!(
            decide("/restaurant", 0, Some(&admin()), now),
            redirect_to("/restaurant/joes-grill-abc123/dashboard", 1)
        );
        assert_eq!(
            decide("/manager//", 0, Some(&manager()), now),
            redirect_to("/manager/centro-u77/dashboard", 1)
        );
    }

    #[test]
    fn test_segment_without_id_redirects() {
        assert_eq!(
            decide("/manager/centro/orders/today", 0, Some(&manager()), Utc::now()),
            redirect_to("/manager/centro-u77/orders/today", 1)
        );
    }

    #[test]
    fn test_incomplete_claims_go_to_selection() {
        let now = Utc::now();
        let mut session = admin();
        session.restaurant_id = None;
        assert_eq!(
            decide("/restaurant/undefined/dashboard", 0, Some(&session), now),
            redirect_to("/select-restaurant", 1)
        );

        let mut session = manager();
        session.unit_name = None;
        assert_eq!(
            decide("/manager/undefined", 1, Some(&session), now),
            redirect_to("/select-unit", 2)
        );
    }

    #[test]
    fn test_valid_admin_area_request_resets_counter() {
        assert_eq!(
            decide("/restaurant/joes-grill-abc123/dashboard", 1, Some(&admin()), Utc::now()),
            Decision::Allow { counter: Some(0) }
        );
        // Managers may use the restaurant area.
        assert_eq!(
            decide("/restaurant/joes-grill-abc123/products", 0, Some(&manager()), Utc::now()),
            Decision::Allow { counter: Some(0) }
        );
    }

    #[test]
    fn test_login_with_session_redirects_home() {
        let now = Utc::now();
        assert_eq!(
            decide("/login", 0, Some(&admin()), now),
            redirect_to("/restaurant/joes-grill-abc123/dashboard", 1)
        );
        assert_eq!(
            decide("/login", 0, Some(&attendant()), now),
            redirect_to("/attendant/centro-u77/orders", 1)
        );
        assert_eq!(
            decide("/login", 1, None, now),
            Decision::Allow { counter: Some(0) }
        );
    }

    // =========================================================================
    // counter cookie
    // =========================================================================

    #[test]
    fn test_read_counter() {
        let mut headers = HeaderMap::new();
        assert_eq!(read_counter(&headers).unwrap(), 0);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("comanda_session=abc; redirect_count=1"),
        );
        assert_eq!(read_counter(&headers).unwrap(), 1);

        headers.insert(header::COOKIE, HeaderValue::from_static("redirect_count=lots"));
        assert_eq!(read_counter(&headers).unwrap(), 0);
    }

    #[test]
    fn test_read_counter_rejects_non_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_bytes(b"redirect_count=\xff").unwrap(),
        );
        assert!(matches!(read_counter(&headers), Err(GuardError::CookieHeader)));
    }

    #[test]
    fn test_counter_cookie_attributes() {
        let cookie = counter_cookie(1);
        assert!(cookie.starts_with("redirect_count=1"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=5"));
    }

    // =========================================================================
    // middleware
    // =========================================================================

    fn app() -> Router {
        async fn sign_in(session: Session) -> StatusCode {
            session
                .insert(session_keys::STAFF_SESSION, admin())
                .await
                .unwrap();
            StatusCode::NO_CONTENT
        }

        Router::new()
            .route("/login", get(|| async { "login" }))
            .route("/restaurant/{slug}/dashboard", get(|| async { "dashboard" }))
            .route("/api/auth/callback", get(|| async { "callback" }))
            .route("/menu/{slug}", get(|| async { "menu" }))
            .route("/test/sign-in", post(sign_in))
            .layer(middleware::from_fn(route_guard_middleware))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    fn request(uri: &str, cookies: &str) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect()
    }

    async fn session_cookie(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/test/sign-in")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        set_cookies(&response)
            .into_iter()
            .find(|c| c.starts_with("id="))
            .and_then(|c| c.split(';').next().map(String::from))
            .unwrap()
    }

    #[tokio::test]
    async fn test_middleware_redirects_anonymous_staff_request() {
        let response = app()
            .oneshot(request("/restaurant/any-slug-1/dashboard", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
        assert!(
            set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("redirect_count=1"))
        );
    }

    #[tokio::test]
    async fn test_middleware_redirects_placeholder_to_canonical() {
        let app = app();
        let session = session_cookie(&app).await;

        let response = app
            .oneshot(request("/restaurant/undefined/dashboard", &session))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/restaurant/joes-grill-abc123/dashboard"
        );
    }

    #[tokio::test]
    async fn test_middleware_allows_and_resets_counter() {
        let app = app();
        let session = session_cookie(&app).await;
        let cookies = format!("{session}; redirect_count=1");

        let response = app
            .oneshot(request("/restaurant/joes-grill-abc123/dashboard", &cookies))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("redirect_count=0"))
        );
    }

    #[tokio::test]
    async fn test_middleware_breaks_redirect_loop() {
        let response = app()
            .oneshot(request("/restaurant/any-slug-1/dashboard", "redirect_count=2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_leaves_callback_and_public_paths_alone() {
        for uri in ["/api/auth/callback", "/menu/joes-grill-abc123"] {
            let response = app()
                .oneshot(request(uri, "redirect_count=1"))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(
                !set_cookies(&response)
                    .iter()
                    .any(|c| c.starts_with(REDIRECT_COUNT_COOKIE)),
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_middleware_fails_closed_on_bad_cookie_header() {
        let mut request = request("/restaurant/joes-grill-abc123/dashboard", "");
        request.headers_mut().insert(
            header::COOKIE,
            HeaderValue::from_bytes(b"redirect_count=\xff").unwrap(),
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    // =========================================================================
    // failing session store
    // =========================================================================

    #[derive(Debug, Clone, Copy)]
    struct OfflineStore;

    fn offline() -> session_store::Error {
        session_store::Error::Backend("store offline".to_string())
    }

    #[async_trait::async_trait]
    impl SessionStore for OfflineStore {
        async fn save(&self, _record: &Record) -> session_store::Result<()> {
            Err(offline())
        }

        async fn load(&self, _session_id: &Id) -> session_store::Result<Option<Record>> {
            Err(offline())
        }

        async fn delete(&self, _session_id: &Id) -> session_store::Result<()> {
            Err(offline())
        }
    }

    fn offline_app() -> Router {
        Router::new()
            .route("/login", get(|| async { "login" }))
            .route("/restaurant/{slug}/dashboard", get(|| async { "dashboard" }))
            .layer(middleware::from_fn(route_guard_middleware))
            .layer(SessionManagerLayer::new(OfflineStore))
    }

    fn offline_cookies(counter: u32) -> String {
        format!("id={}; redirect_count={counter}", Id::default())
    }

    #[tokio::test]
    async fn test_middleware_fails_closed_when_store_fails() {
        for (uri, counter) in [("/restaurant/joes-grill-abc123/dashboard", 0), ("/login", 1)] {
            let response = offline_app()
                .oneshot(request(uri, &offline_cookies(counter)))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{uri}");
            assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
            let expected = format!("redirect_count={}", counter + 1);
            assert!(
                set_cookies(&response).iter().any(|c| c.starts_with(&expected)),
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_loop_breaker_skips_failing_store() {
        for uri in ["/login", "/restaurant/joes-grill-abc123/dashboard"] {
            let response = offline_app()
                .oneshot(request(uri, &offline_cookies(2)))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(
                set_cookies(&response)
                    .iter()
                    .any(|c| c.starts_with("redirect_count=0")),
                "{uri}"
            );
        }
    }
}
