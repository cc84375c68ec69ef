//! Comanda Core - Shared types library.
//!
//! This crate provides the domain types and pure algorithms used across all
//! Comanda components:
//! - `web` - Guest menu, cart API and staff area behind the route guard
//! - `cli` - Command-line tools for migrations and slug inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and statuses
//! - [`slug`] - Encode a display name and id into a single URL path segment
//! - [`cart`] - Cart aggregate with merge policy and totals
//! - [`order`] - Guest order aggregate (cart + table binding + order type)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod slug;
pub mod types;

pub use cart::{Addon, Cart, CartAction, CartItem, MAX_QUANTITY};
pub use order::{GuestIdentity, GuestOrder, TableBinding};
pub use slug::SlugError;
pub use types::*;
