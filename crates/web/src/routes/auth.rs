//! Staff authentication route handlers.
//!
//! Login goes through the backend's `/auth/login`; the returned token and
//! user claims become the [`StaffSession`]. The selection pages fill in the
//! restaurant or unit claims for users the backend did not bind to one.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comanda_core::{RestaurantId, UnitId};

use crate::backend::{BackendError, token_expiry};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{RequireStaff, clear_staff_session, set_staff_session};
use crate::models::{SELECT_RESTAURANT_PATH, SELECT_UNIT_PATH, SessionView, StaffSession};
use crate::state::AppState;

/// Token lifetime assumed when the callback does not state one.
const DEFAULT_CALLBACK_TOKEN_TTL_SECONDS: i64 = 60 * 60;

// =============================================================================
// Form & Query Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

/// Query parameters of the external sign-in callback.
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
}

/// Selection form data (restaurant or unit id).
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
}

/// One choice on a selection page.
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

/// Restaurant or unit selection page.
#[derive(Template, WebTemplate)]
#[template(path = "staff/select.html")]
pub struct SelectTemplate {
    pub title: &'static str,
    pub action: &'static str,
    pub staff_name: String,
    pub options: Vec<SelectOption>,
}

/// Human readable message for a login error code.
fn login_error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "timeout" => "The server took too long to answer. Please try again.",
        "callback" => "Sign-in link is invalid or expired.",
        "session" => "Could not start your session. Please try again.",
        _ => "Sign-in failed. Please try again.",
    }
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.as_deref().map(login_error_message).map(String::from),
        email: String::new(),
    }
}

/// Store a fresh staff session under a new session id.
async fn start_staff_session(session: &Session, staff: &StaffSession) -> Result<(), AppError> {
    session.cycle_id().await?;
    set_staff_session(session, staff).await?;
    set_sentry_user(&staff.user_id, Some(&staff.email));
    Ok(())
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let failure = |code: &str, status: StatusCode| {
        (
            status,
            LoginTemplate {
                error: Some(login_error_message(code).to_string()),
                email: form.email.clone(),
            },
        )
            .into_response()
    };

    let login = match state.backend().login(&form.email, &form.password).await {
        Ok(login) => login,
        Err(BackendError::Unauthorized) => {
            tracing::info!("Login rejected");
            return failure("credentials", StatusCode::UNAUTHORIZED);
        }
        Err(e) if e.is_timeout() => {
            tracing::warn!(error = %e, "Login timed out");
            return failure("timeout", StatusCode::GATEWAY_TIMEOUT);
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            return failure("backend", StatusCode::BAD_GATEWAY);
        }
    };

    let staff = login.into_session(Utc::now());
    if let Err(e) = start_staff_session(&session, &staff).await {
        tracing::error!(error = %e, "Failed to store staff session");
        return failure("session", StatusCode::INTERNAL_SERVER_ERROR);
    }

    tracing::info!(user_id = %staff.user_id, role = %staff.role, "Staff signed in");
    Redirect::to(&staff.home_path()).into_response()
}

/// Handle logout.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_staff_session(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    Ok(Redirect::to("/login"))
}

// =============================================================================
// Auth API
// =============================================================================

/// Current session as JSON, without the access token.
pub async fn session_info(RequireStaff(staff): RequireStaff) -> Json<SessionView> {
    Json(SessionView::from(&staff))
}

/// Expiry of a callback token. Missing or non-positive lifetimes use the
/// default.
fn callback_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let ttl = expires_in
        .filter(|seconds| *seconds > 0)
        .unwrap_or(DEFAULT_CALLBACK_TOKEN_TTL_SECONDS);
    token_expiry(now, ttl)
}

/// Complete an external sign-in with a backend-issued token.
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(token) = query.token.filter(|t| !t.trim().is_empty()) else {
        return Redirect::to("/login?error=callback").into_response();
    };

    let user = match state.backend().current_user(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in callback rejected");
            return Redirect::to("/login?error=callback").into_response();
        }
    };

    let staff = user.into_session(token, callback_expiry(Utc::now(), query.expires_in));

    if let Err(e) = start_staff_session(&session, &staff).await {
        tracing::error!(error = %e, "Failed to store staff session");
        return Redirect::to("/login?error=session").into_response();
    }

    Redirect::to(&staff.home_path()).into_response()
}

// =============================================================================
// Restaurant / Unit Selection
// =============================================================================

/// List restaurants to pick from.
#[instrument(skip(state, staff), fields(user_id = %staff.user_id))]
pub async fn select_restaurant_page(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<impl IntoResponse, AppError> {
    let restaurants = state.backend().list_restaurants(&staff.access_token).await?;

    Ok(SelectTemplate {
        title: "Choose a restaurant",
        action: SELECT_RESTAURANT_PATH,
        staff_name: staff.name,
        options: restaurants
            .into_iter()
            .map(|r| SelectOption {
                id: r.id.into_inner(),
                name: r.name,
            })
            .collect(),
    })
}

/// Bind the chosen restaurant into the session.
#[instrument(skip(state, session, staff), fields(user_id = %staff.user_id))]
pub async fn select_restaurant(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(mut staff): RequireStaff,
    Form(form): Form<SelectForm>,
) -> Result<Redirect, AppError> {
    let restaurants = state.backend().list_restaurants(&staff.access_token).await?;
    let chosen = RestaurantId::new(form.id);
    let restaurant = restaurants
        .into_iter()
        .find(|r| r.id == chosen)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {chosen}")))?;

    if staff.restaurant_id.as_ref() != Some(&restaurant.id) {
        staff.unit_id = None;
        staff.unit_name = None;
    }
    staff.restaurant_id = Some(restaurant.id);
    staff.restaurant_name = Some(restaurant.name);
    set_staff_session(&session, &staff).await?;

    Ok(Redirect::to(&staff.home_path()))
}

/// List units of the bound restaurant to pick from.
#[instrument(skip(state, staff), fields(user_id = %staff.user_id))]
pub async fn select_unit_page(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<Response, AppError> {
    let Some(restaurant_id) = staff.restaurant_id.as_ref() else {
        return Ok(Redirect::to(SELECT_RESTAURANT_PATH).into_response());
    };
    let units = state
        .backend()
        .list_units(&staff.access_token, restaurant_id)
        .await?;

    Ok(SelectTemplate {
        title: "Choose a unit",
        action: SELECT_UNIT_PATH,
        staff_name: staff.name,
        options: units
            .into_iter()
            .map(|u| SelectOption {
                id: u.id.into_inner(),
                name: u.name,
            })
            .collect(),
    }
    .into_response())
}

/// Bind the chosen unit into the session.
#[instrument(skip(state, session, staff), fields(user_id = %staff.user_id))]
pub async fn select_unit(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(mut staff): RequireStaff,
    Form(form): Form<SelectForm>,
) -> Result<Redirect, AppError> {
    let Some(restaurant_id) = staff.restaurant_id.clone() else {
        return Ok(Redirect::to(SELECT_RESTAURANT_PATH));
    };
    let units = state
        .backend()
        .list_units(&staff.access_token, &restaurant_id)
        .await?;
    let chosen = UnitId::new(form.id);
    let unit = units
        .into_iter()
        .find(|u| u.id == chosen)
        .ok_or_else(|| AppError::NotFound(format!("unit {chosen}")))?;

    staff.unit_id = Some(unit.id);
    staff.unit_name = Some(unit.name);
    set_staff_session(&session, &staff).await?;

    Ok(Redirect::to(&staff.home_path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_messages() {
        assert_eq!(login_error_message("credentials"), "Invalid email or password.");
        assert_eq!(
            login_error_message("anything-else"),
            "Sign-in failed. Please try again."
        );
    }

    #[test]
    fn test_callback_expiry() {
        let now = Utc::now();
        assert_eq!(
            callback_expiry(now, None),
            now + chrono::Duration::seconds(DEFAULT_CALLBACK_TOKEN_TTL_SECONDS)
        );
        assert_eq!(
            callback_expiry(now, Some(0)),
            callback_expiry(now, None)
        );
        assert_eq!(
            callback_expiry(now, Some(i64::MAX)),
            now + chrono::Duration::seconds(crate::backend::MAX_TOKEN_TTL_SECONDS)
        );
    }
}
