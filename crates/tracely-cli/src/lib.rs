//! Tracely command-line tools.
//!
//! The `tracely` binary is a thin shell over this library so the argument
//! parsing and commands can be exercised from tests.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use error::{CliError, Exit};
