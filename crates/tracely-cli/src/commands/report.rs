//! Report command implementation.

use clap::{Parser, Subcommand};
use tracely_common_core::{LocalStore, SystemClock};
use tracely_sdk::{signed_fetch, ActivePayload, ErrorData, ErrorKind, Report, UserIds};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, StatusOutput};

/// Send a single signed report
#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[command(subcommand)]
    pub action: ReportAction,
}

#[derive(Debug, Subcommand)]
pub enum ReportAction {
    /// Report an error to /report/error
    Error {
        /// Error type, e.g. jsError, promiseError, manualError
        #[arg(short = 't', long = "type", default_value = "manualError")]
        kind: String,

        /// Error message
        #[arg(short, long)]
        message: String,

        /// Stack trace
        #[arg(long)]
        stack: Option<String>,

        /// Page URL the error happened on
        #[arg(long, default_value = "")]
        url: String,
    },

    /// Report time spent on a page to /report/active
    Active {
        /// Page path, e.g. /dashboard
        #[arg(short, long)]
        page: String,

        /// Dwell time in whole seconds
        #[arg(short, long)]
        duration: u64,

        /// User id. Defaults to this machine's persisted anonymous id.
        #[arg(long)]
        user_id: Option<String>,
    },
}

impl ReportCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let config = ctx.sdk_config()?;
        let report = self.build(ctx, &config.app_id)?;

        let http = ctx.http_client()?;
        let clock = SystemClock::shared();
        let path = report.endpoint().path();

        if !signed_fetch(&http, &config, &clock, path, &report).await {
            return Err(CliError::network(
                "The collector did not accept the report",
                format!("{}{}", config.host, path),
            ));
        }

        print_output(ctx, &StatusOutput::success(format!("Report sent to {path}")))
    }

    fn build(&self, ctx: &CommandContext, app_id: &str) -> Result<Report, CliError> {
        match &self.action {
            ReportAction::Error {
                kind,
                message,
                stack,
                url,
            } => {
                if message.trim().is_empty() {
                    return Err(CliError::validation("Error message must not be empty", "message"));
                }
                let data = ErrorData::new(ErrorKind::from(kind.as_str()), message, url)
                    .with_stack(stack.clone());
                Ok(Report::Error(data))
            }
            ReportAction::Active {
                page,
                duration,
                user_id,
            } => {
                let user_id = match user_id {
                    Some(id) => id.clone(),
                    None => {
                        let store: std::sync::Arc<dyn LocalStore> = ctx.open_store()?;
                        UserIds::new(store).get_or_create()
                    }
                };
                Ok(Report::Active(ActivePayload {
                    app_id: app_id.to_string(),
                    user_id,
                    page: page.clone(),
                    duration: *duration,
                }))
            }
        }
    }
}
