//! SDK error types.
//!
//! Only construction can fail. Reporting paths log and swallow.

use thiserror::Error;
use tracely_common_config::ConfigError;
use tracely_common_http::HttpError;

/// Errors raised while building a client.
#[derive(Debug, Error)]
pub enum TracelyError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised while building a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no tokio runtime available to run the delivery worker")]
    NoRuntime,

    #[error(transparent)]
    Http(#[from] HttpError),
}

pub type Result<T> = std::result::Result<T, TracelyError>;
