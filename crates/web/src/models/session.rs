//! Session-related types.
//!
//! Types stored in the session for authentication and guest state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comanda_core::{RestaurantId, StaffRole, UnitId, UserId, slug};

/// Where staff without a restaurant binding pick one.
pub const SELECT_RESTAURANT_PATH: &str = "/select-restaurant";

/// Where staff without a unit binding pick one.
pub const SELECT_UNIT_PATH: &str = "/select-unit";

/// Session-stored staff identity (the decoded session token).
///
/// Implements `Debug` manually to redact the backend access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct StaffSession {
    /// Backend user id.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role issued by the backend.
    pub role: StaffRole,
    pub restaurant_id: Option<RestaurantId>,
    pub restaurant_name: Option<String>,
    pub unit_id: Option<UnitId>,
    pub unit_name: Option<String>,
    /// Bearer token for backend calls made on behalf of this user.
    pub access_token: String,
    /// When the backend token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for StaffSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaffSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("restaurant_id", &self.restaurant_id)
            .field("unit_id", &self.unit_id)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl StaffSession {
    /// Check whether the backend token has expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Slug for `/restaurant/{slug}`, if both restaurant claims are present.
    #[must_use]
    pub fn restaurant_slug(&self) -> Option<String> {
        let name = self.restaurant_name.as_deref()?;
        let id = self.restaurant_id.as_ref()?;
        slug::encode(name, id.as_str()).ok()
    }

    /// Slug for `/manager/{slug}` and `/attendant/{slug}`, if both unit claims
    /// are present.
    #[must_use]
    pub fn unit_slug(&self) -> Option<String> {
        let name = self.unit_name.as_deref()?;
        let id = self.unit_id.as_ref()?;
        slug::encode(name, id.as_str()).ok()
    }

    /// Landing page for this role after login.
    #[must_use]
    pub fn home_path(&self) -> String {
        match self.role {
            StaffRole::Admin => self.restaurant_slug().map_or_else(
                || SELECT_RESTAURANT_PATH.to_string(),
                |slug| format!("/restaurant/{slug}/dashboard"),
            ),
            StaffRole::Manager => self.unit_slug().map_or_else(
                || SELECT_UNIT_PATH.to_string(),
                |slug| format!("/manager/{slug}/dashboard"),
            ),
            StaffRole::Attendant => self.unit_slug().map_or_else(
                || SELECT_UNIT_PATH.to_string(),
                |slug| format!("/attendant/{slug}/orders"),
            ),
        }
    }
}

/// Public view of the session, without the access token.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    pub restaurant_id: Option<RestaurantId>,
    pub restaurant_name: Option<String>,
    pub unit_id: Option<UnitId>,
    pub unit_name: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub home: String,
}

impl From<&StaffSession> for SessionView {
    fn from(session: &StaffSession) -> Self {
        Self {
            user_id: session.user_id.clone(),
            name: session.name.clone(),
            email: session.email.clone(),
            role: session.role,
            restaurant_id: session.restaurant_id.clone(),
            restaurant_name: session.restaurant_name.clone(),
            unit_id: session.unit_id.clone(),
            unit_name: session.unit_name.clone(),
            expires_at: session.expires_at,
            home: session.home_path(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for the logged-in staff member.
    pub const STAFF_SESSION: &str = "staff_session";

    /// Key for the guest order aggregate (cart, table, order type, guest).
    pub const GUEST_ORDER: &str = "guest_order";
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, Utc};

    use super::*;

    /// An admin of "Joe's Grill" with a valid token.
    pub fn admin() -> StaffSession {
        StaffSession {
            user_id: UserId::new("u1"),
            name: "Joe".to_string(),
            email: "joe@example.com".to_string(),
            role: StaffRole::Admin,
            restaurant_id: Some(RestaurantId::new("abc123")),
            restaurant_name: Some("Joe's Grill".to_string()),
            unit_id: None,
            unit_name: None,
            access_token: "backend-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    /// A manager of the "Centro" unit.
    pub fn manager() -> StaffSession {
        StaffSession {
            role: StaffRole::Manager,
            unit_id: Some(UnitId::new("u77")),
            unit_name: Some("Centro".to_string()),
            ..admin()
        }
    }

    pub fn attendant() -> StaffSession {
        StaffSession {
            role: StaffRole::Attendant,
            ..manager()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::fixtures::{admin, attendant, manager};
    use super::*;

    #[test]
    fn test_home_path_per_role() {
        assert_eq!(admin().home_path(), "/restaurant/joes-grill-abc123/dashboard");
        assert_eq!(manager().home_path(), "/manager/centro-u77/dashboard");
        assert_eq!(attendant().home_path(), "/attendant/centro-u77/orders");
    }

    #[test]
    fn test_home_path_with_incomplete_claims() {
        let mut session = admin();
        session.restaurant_name = None;
        assert_eq!(session.home_path(), SELECT_RESTAURANT_PATH);

        let mut session = manager();
        session.unit_id = None;
        assert_eq!(session.home_path(), SELECT_UNIT_PATH);
    }

    #[test]
    fn test_is_expired() {
        let session = admin();
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(session.expires_at));
        assert!(session.is_expired(session.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let output = format!("{:?}", admin());
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("backend-token"));
    }

    #[test]
    fn test_session_view_omits_token() {
        let view = SessionView::from(&admin());
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("backend-token"));
        assert!(json.contains("\"role\":\"ADMIN\""));
    }
}
