//! CLI argument definitions.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use tracely_common_config::{validate_sdk, vars, ConfigLoader, TracelyConfig, TracelySettings};
use tracely_common_core::FileStore;
use tracely_common_http::{HttpClient, HttpConfig};

use crate::commands::{DashboardCommand, ReportCommand, SeedCommand, SignCommand};
use crate::error::CliError;

/// Tracely - error and activity reporting
///
/// Send signed reports to a collector, generate test data and query the
/// dashboard API.
#[derive(Debug, Parser)]
#[command(
    name = "tracely",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = vars::TRACELY_CONFIG,
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a single signed report
    Report(ReportCommand),

    /// Print a freshly signed set of authentication headers
    Sign(SignCommand),

    /// Fill a collector with test activity and error data
    Seed(SeedCommand),

    /// Query the dashboard API
    #[command(visible_alias = "dash")]
    Dashboard(DashboardCommand),
}

impl Cli {
    /// Load `--config` if given, otherwise `.tracely/config.yaml` in the
    /// working directory (or defaults when absent).
    pub fn load_config(&self) -> Result<TracelySettings, CliError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::from_file(path),
            None => ConfigLoader::default(),
        };
        tracing::debug!(path = %loader.path().display(), "loading configuration");
        Ok(loader.load()?)
    }

    pub async fn execute(self, settings: TracelySettings) -> Result<(), CliError> {
        let ctx = CommandContext {
            settings,
            format: self.format,
            verbose: self.verbose,
        };

        match self.command {
            Command::Report(cmd) => cmd.execute(&ctx).await,
            Command::Sign(cmd) => cmd.execute(&ctx).await,
            Command::Seed(cmd) => cmd.execute(&ctx).await,
            Command::Dashboard(cmd) => cmd.execute(&ctx).await,
        }
    }
}

/// What every command gets to work with.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub settings: TracelySettings,
    pub format: OutputFormat,
    pub verbose: u8,
}

impl CommandContext {
    /// Reporting credentials, validated.
    pub fn sdk_config(&self) -> Result<TracelyConfig, CliError> {
        let config = self.settings.sdk.clone();
        validate_sdk(&config).map_err(|e| {
            CliError::config_with_hint(
                e.to_string(),
                "Set sdk.app_id, sdk.app_secret and sdk.host in .tracely/config.yaml, \
                 or TRACELY_APP_ID, TRACELY_APP_SECRET and TRACELY_HOST",
            )
        })?;
        Ok(config)
    }

    /// HTTP client honouring the configured request timeout.
    pub fn http_client(&self) -> Result<HttpClient, CliError> {
        Ok(HttpClient::with_config(HttpConfig::with_timeout(
            self.settings.transport.timeout(),
        ))?)
    }

    /// The persisted state file. The user id and the dashboard session share
    /// it, so open it once per command.
    pub fn open_store(&self) -> Result<Arc<FileStore>, CliError> {
        Ok(Arc::new(FileStore::open(self.settings.dashboard.state_file())?))
    }
}
