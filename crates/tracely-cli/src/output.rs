//! Output formatting for command results.

use serde::Serialize;
use std::io::Write;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::CliError;

/// Something a command prints.
pub trait FormattedOutput {
    fn format_text(&self) -> String;

    fn format_json(&self) -> Result<String, serde_json::Error>
    where
        Self: Serialize,
    {
        serde_json::to_string_pretty(self)
    }
}

fn render<T>(ctx: &CommandContext, value: &T) -> Result<String, CliError>
where
    T: FormattedOutput + Serialize,
{
    match ctx.format {
        OutputFormat::Text => Ok(value.format_text()),
        OutputFormat::Json => value
            .format_json()
            .map_err(|e| CliError::Other(anyhow::anyhow!("JSON serialization failed: {}", e))),
    }
}

/// Print to stdout in the selected format.
pub fn print_output<T>(ctx: &CommandContext, value: &T) -> Result<(), CliError>
where
    T: FormattedOutput + Serialize,
{
    println!("{}", render(ctx, value)?);
    Ok(())
}

/// Write to `writer` in the selected format.
pub fn write_output<T, W>(ctx: &CommandContext, value: &T, mut writer: W) -> Result<(), CliError>
where
    T: FormattedOutput + Serialize,
    W: Write,
{
    writeln!(writer, "{}", render(ctx, value)?)?;
    Ok(())
}

/// Success/failure line.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub status: String,
    pub message: String,
}

impl StatusOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

impl FormattedOutput for StatusOutput {
    fn format_text(&self) -> String {
        format!("✓ {}", self.message)
    }
}
