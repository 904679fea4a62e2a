//! Tower middleware that reports to Tracely from an axum server.
//!
//! - [`RecoveryLayer`] turns handler panics into `panicError` reports and a
//!   500 JSON response.
//! - [`RequestTrackerLayer`] reports every request as an activity record
//!   keyed by its matched route.
//!
//! ```no_run
//! # async fn run(tracely: tracely_sdk::Tracely) {
//! use axum::{routing::get, Router};
//! use tracely_axum::{RecoveryLayer, RequestTrackerLayer};
//!
//! let app: Router = Router::new()
//!     .route("/users/:id", get(|| async { "ok" }))
//!     .layer(RequestTrackerLayer::from_client(&tracely))
//!     .layer(RecoveryLayer::from_client(&tracely));
//! # }
//! ```

pub mod recovery;
pub mod tracker;

pub use recovery::{RecoveryLayer, RecoveryMiddleware};
pub use tracker::{DurationUnit, RequestTrackerLayer, RequestTrackerMiddleware};

use axum::extract::{MatchedPath, Request};

/// Matched route template, falling back to the raw path.
pub(crate) fn route_of(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}
