//! Client for the Tracely dashboard API.
//!
//! Mirrors the admin UI's data layer: a bearer token and the selected
//! application are kept in a local store, attached to every request, and a
//! 401 from the server logs the user out.

pub mod client;
pub mod error;
pub mod session;
pub mod types;

pub use client::{resolve_current_app, DashboardClient};
pub use error::{DashboardError, Result};
pub use session::{SessionStore, CURRENT_APP_KEY, TOKEN_KEY, USER_KEY};
pub use types::*;
