//! Staff authentication extractors.
//!
//! The route guard already keeps anonymous users out of the staff area; these
//! extractors hand the session to handlers and cover routes the guard does
//! not match (selection pages, `/api/auth/*`).

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::middleware::route_guard::LOGIN_PATH;
use crate::models::{StaffSession, session_keys};

/// Extractor that requires a live staff session.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireStaff(staff): RequireStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.name)
/// }
/// ```
pub struct RequireStaff(pub StaffSession);

/// Rejection when a staff session is required but missing or expired.
#[derive(Debug)]
pub enum StaffRejection {
    /// Redirect to the login page (HTML requests).
    RedirectToLogin,
    /// 401 (API requests).
    Unauthorized,
}

impl IntoResponse for StaffRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Read a live staff session from the request's session, if any.
async fn live_staff_session(parts: &Parts) -> Option<StaffSession> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<StaffSession>(session_keys::STAFF_SESSION)
        .await
        .ok()
        .flatten()
        .filter(|staff| !staff.is_expired(Utc::now()))
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = StaffRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        live_staff_session(parts).await.map(Self).ok_or_else(|| {
            if parts.uri.path().starts_with("/api/") {
                StaffRejection::Unauthorized
            } else {
                StaffRejection::RedirectToLogin
            }
        })
    }
}

/// Store the staff session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_staff_session(
    session: &Session,
    staff: &StaffSession,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::STAFF_SESSION, staff).await
}

/// Remove the staff session (logout). Guest state in the same session is
/// left alone.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_staff_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<StaffSession>(session_keys::STAFF_SESSION)
        .await?;
    Ok(())
}
