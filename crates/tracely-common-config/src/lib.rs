//! Configuration types for Tracely.
//!
//! Settings come from `.tracely/config.yaml` (or an explicit file), with
//! `${VAR}` expansion and `TRACELY_*` environment overrides applied on top.

pub mod env;
pub mod loader;
pub mod secret;
pub mod types;

pub use env::{vars, EnvError, Environment, Lookup};
pub use loader::{apply_env_overrides, apply_overrides_from, validate, validate_sdk, ConfigError, ConfigLoader};
pub use secret::SecretString;
pub use types::*;
