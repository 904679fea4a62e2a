//! Environment variable handling.

use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Environment variable names.
pub mod vars {
    // Reporting credentials
    pub const TRACELY_APP_ID: &str = "TRACELY_APP_ID";
    pub const TRACELY_APP_SECRET: &str = "TRACELY_APP_SECRET";
    pub const TRACELY_HOST: &str = "TRACELY_HOST";
    pub const TRACELY_TIMESTAMP_UNIT: &str = "TRACELY_TIMESTAMP_UNIT";

    // Delivery and capture
    pub const TRACELY_TIMEOUT_MS: &str = "TRACELY_TIMEOUT_MS";
    pub const TRACELY_CAPTURE_PANICS: &str = "TRACELY_CAPTURE_PANICS";

    // Dashboard
    pub const TRACELY_DASHBOARD_URL: &str = "TRACELY_DASHBOARD_URL";
    pub const TRACELY_DATA_DIR: &str = "TRACELY_DATA_DIR";

    // Configuration
    pub const TRACELY_CONFIG: &str = "TRACELY_CONFIG";
    pub const TRACELY_ENV: &str = "TRACELY_ENV";
}

/// A variable source. [`Environment::process`] reads the real environment.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Environment access.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Load `.env`, `.env.local` and `.env.<TRACELY_ENV>`, in that order.
    /// Variables that are already set are never overridden.
    pub fn init() -> Self {
        let _ = dotenvy::from_filename(".env");
        let _ = dotenvy::from_filename(".env.local");

        if let Ok(name) = env::var(vars::TRACELY_ENV) {
            let _ = dotenvy::from_filename(format!(".env.{}", name));
        }

        Self { _guard: () }
    }

    /// Lookup over the process environment.
    pub fn process(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get an optional, non-empty string variable.
    pub fn get(var: &str) -> Option<String> {
        Self::get_in(&Self::process, var)
    }

    /// Get an optional, non-empty string variable from `lookup`.
    pub fn get_in(lookup: Lookup<'_>, var: &str) -> Option<String> {
        lookup(var).filter(|v| !v.is_empty())
    }

    /// Get a boolean variable from `lookup`.
    pub fn get_bool_in(lookup: Lookup<'_>, var: &str) -> Option<bool> {
        Self::get_in(lookup, var).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Get an integer variable from `lookup`.
    pub fn get_int_in<T: std::str::FromStr>(lookup: Lookup<'_>, var: &str) -> Result<Option<T>, EnvError> {
        match Self::get_in(lookup, var) {
            Some(v) => v.parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("expected integer, got '{}'", v),
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(name: &'static str, value: &'static str) -> impl Fn(&str) -> Option<String> {
        move |var| (var == name).then(|| value.to_string())
    }

    #[test]
    fn test_unset_variable() {
        assert_eq!(Environment::get("TRACELY_NONEXISTENT_VAR_12345"), None);
    }

    #[test]
    fn test_empty_value_is_unset() {
        assert_eq!(Environment::get_in(&one("TRACELY_TEST_EMPTY", ""), "TRACELY_TEST_EMPTY"), None);
    }

    #[test]
    fn test_bool_parsing() {
        for (value, expected) in [("true", true), ("1", true), ("YES", true), ("false", false), ("0", false)] {
            assert_eq!(
                Environment::get_bool_in(&one("TRACELY_TEST_BOOL", value), "TRACELY_TEST_BOOL"),
                Some(expected),
                "value {value}"
            );
        }
    }

    #[test]
    fn test_integer_parsing() {
        let val: Result<Option<i32>, _> = Environment::get_int_in(&one("TRACELY_TEST_INT", "42"), "TRACELY_TEST_INT");
        assert_eq!(val.unwrap(), Some(42));

        let val: Result<Option<i32>, _> =
            Environment::get_int_in(&one("TRACELY_TEST_INT", "invalid"), "TRACELY_TEST_INT");
        assert!(val.is_err());

        let val: Result<Option<i32>, _> = Environment::get_int_in(&one("OTHER", "1"), "TRACELY_TEST_INT");
        assert_eq!(val.unwrap(), None);
    }
}
