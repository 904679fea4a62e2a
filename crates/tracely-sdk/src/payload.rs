//! Report bodies.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Category of a reported error, serialised as its wire name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Uncaught runtime error.
    JsError,
    /// Unhandled asynchronous failure.
    PromiseError,
    /// Reported by the host through `capture_error`.
    ManualError,
    /// Panic caught by the hook or the recovery middleware.
    PanicError,
    /// Any other label, used by the CLI and the seed generator.
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::JsError => "jsError",
            Self::PromiseError => "promiseError",
            Self::ManualError => "manualError",
            Self::PanicError => "panicError",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(s: &str) -> Self {
        match s {
            "jsError" => Self::JsError,
            "promiseError" => Self::PromiseError,
            "manualError" => Self::ManualError,
            "panicError" => Self::PanicError,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Body of `POST /report/error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub url: String,
}

impl ErrorData {
    pub fn new(kind: ErrorKind, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
            url: url.into(),
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    /// Throttle key for this error.
    pub fn fingerprint(&self, max_chars: usize) -> String {
        fingerprint(&self.kind, &self.message, max_chars)
    }
}

/// `kind:message`, cut to at most `max_chars` characters.
pub fn fingerprint(kind: &ErrorKind, message: &str, max_chars: usize) -> String {
    kind.as_str()
        .chars()
        .chain(std::iter::once(':'))
        .chain(message.chars())
        .take(max_chars)
        .collect()
}

/// Body of `POST /report/active`. `duration` is in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePayload {
    pub app_id: String,
    pub user_id: String,
    pub page: String,
    pub duration: u64,
}
