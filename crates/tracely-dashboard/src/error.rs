//! Dashboard client errors.

use thiserror::Error;
use tracely_common_core::StoreError;
use tracely_common_http::{HttpError, ResponseError};

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The server rejected the token. The stored session has been cleared.
    #[error("session expired or invalid, please log in again")]
    Unauthorized,

    #[error(transparent)]
    Http(HttpError),

    #[error("unexpected response: {0}")]
    Response(#[from] ResponseError),

    #[error("local state error: {0}")]
    Store(#[from] StoreError),
}

impl From<HttpError> for DashboardError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Unauthorized => Self::Unauthorized,
            other => Self::Http(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
