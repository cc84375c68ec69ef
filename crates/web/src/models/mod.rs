//! Domain models for the web crate.
//!
//! Types stored in the session. Cart and order types live in `comanda-core`.

pub mod session;

pub use session::{
    SELECT_RESTAURANT_PATH, SELECT_UNIT_PATH, SessionView, StaffSession, keys as session_keys,
};
