//! Sign command implementation.

use clap::Parser;
use serde::Serialize;
use tracely_common_core::SystemClock;
use tracely_sdk::{build_headers, AuthHeaders};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// Print a freshly signed set of authentication headers
#[derive(Debug, Parser)]
pub struct SignCommand {
    /// Print as `-H` arguments for curl
    #[arg(long)]
    pub curl: bool,
}

/// One signed header set, keyed by header name.
#[derive(Debug, Serialize)]
pub struct SignOutput {
    #[serde(rename = "X-App-Id")]
    pub app_id: String,
    #[serde(rename = "X-Timestamp")]
    pub timestamp: String,
    #[serde(rename = "X-Nonce")]
    pub nonce: String,
    #[serde(rename = "X-Signature")]
    pub signature: String,
    #[serde(skip)]
    curl: bool,
}

impl SignOutput {
    pub fn new(headers: AuthHeaders, curl: bool) -> Self {
        Self {
            app_id: headers.app_id,
            timestamp: headers.timestamp,
            nonce: headers.nonce,
            signature: headers.signature,
            curl,
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("X-App-Id", self.app_id.as_str()),
            ("X-Timestamp", self.timestamp.as_str()),
            ("X-Nonce", self.nonce.as_str()),
            ("X-Signature", self.signature.as_str()),
        ]
    }
}

impl FormattedOutput for SignOutput {
    fn format_text(&self) -> String {
        let lines = self.pairs().into_iter().map(|(name, value)| {
            if self.curl {
                format!("-H '{name}: {value}'")
            } else {
                format!("{name}: {value}")
            }
        });
        let separator = if self.curl { " " } else { "\n" };
        lines.collect::<Vec<_>>().join(separator)
    }
}

impl SignCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let config = ctx.sdk_config()?;
        let headers = build_headers(&config, SystemClock::shared().as_ref());
        print_output(ctx, &SignOutput::new(headers, self.curl))
    }
}
