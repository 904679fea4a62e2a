//! CLI error handling.

use std::io;
use std::process::ExitCode;

use thiserror::Error;
use tracely_common_config::ConfigError;
use tracely_common_core::StoreError;
use tracely_common_http::HttpError;
use tracely_dashboard::DashboardError;

/// Process exit codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    IoError = 3,
    NetworkError = 4,
    ValidationError = 5,
    NotFound = 6,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

/// CLI error type with enough context to print a useful message.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("{message}")]
    Store {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        url: Option<String>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        suggestions: Vec<String>,
    },

    #[error("{message}")]
    User {
        message: String,
        hint: Option<String>,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Stable error code, printed alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Network { .. } => "E003",
            Self::Validation { .. } => "E004",
            Self::NotFound { .. } => "E005",
            Self::Store { .. } => "E006",
            Self::User { .. } => "E010",
            Self::Other(_) => "E999",
        }
    }

    pub fn exit_code(&self) -> Exit {
        match self {
            Self::Config { .. } => Exit::ConfigError,
            Self::Io { .. } | Self::Store { .. } => Exit::IoError,
            Self::Network { .. } => Exit::NetworkError,
            Self::Validation { .. } => Exit::ValidationError,
            Self::NotFound { .. } => Exit::NotFound,
            Self::User { .. } | Self::Other(_) => Exit::GeneralError,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } | Self::User { hint, .. } => hint.as_deref(),
            Self::NotFound { suggestions, .. } if !suggestions.is_empty() => {
                Some("See suggestions below")
            }
            _ => None,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::NotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    pub fn config_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: Some(hint.into()),
        }
    }

    pub fn network(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
            url: Some(url.into()),
        }
    }

    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn not_found_with_suggestions(message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            suggestions,
        }
    }

    pub fn user_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Render for the terminal.
    pub fn render(&self) -> String {
        let mut out = format!("error[{}]: {}", self.code(), self);
        match self {
            Self::Network { url: Some(url), .. } => out.push_str(&format!("\n  url: {url}")),
            Self::Validation { field: Some(field), .. } => out.push_str(&format!("\n  field: {field}")),
            _ => {}
        }
        if let Some(hint) = self.hint() {
            out.push_str(&format!("\n  hint: {hint}"));
        }
        for suggestion in self.suggestions() {
            out.push_str(&format!("\n    - {suggestion}"));
        }
        out
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: format!("Configuration error: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check .tracely/config.yaml or the TRACELY_* environment variables".to_string()),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Store {
            message: format!("Local state error: {err}"),
            source: err,
        }
    }
}

impl From<HttpError> for CliError {
    fn from(err: HttpError) -> Self {
        Self::Network {
            message: format!("HTTP error: {err}"),
            source: Some(Box::new(err)),
            url: None,
        }
    }
}

impl From<DashboardError> for CliError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Unauthorized => Self::user_with_hint(
                "Not logged in, or the session has expired",
                "Run `tracely dashboard login` to sign in again",
            ),
            DashboardError::Http(e) => e.into(),
            DashboardError::Response(e) => Self::Network {
                message: format!("Unexpected dashboard response: {e}"),
                source: Some(Box::new(e)),
                url: None,
            },
            DashboardError::Store(e) => e.into(),
        }
    }
}
