//! Entry point for the `tracely` binary.

use std::process::ExitCode;

use clap::Parser;
use tracely_cli::cli::Cli;
use tracely_cli::{CliError, Exit};
use tracely_common_config::Environment;
use tracely_common_log::{LogConfig, LogLevel};

fn main() -> ExitCode {
    let _env = Environment::init();
    let cli = Cli::parse();

    init_tracing(&cli);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start the async runtime: {e}");
            return Exit::GeneralError.into();
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => Exit::Success.into(),
        Err(e) => {
            tracing::debug!(code = e.code(), error = ?e, "command failed");
            eprintln!("{}", e.render());
            e.exit_code().into()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = cli.load_config()?;
    cli.execute(settings).await
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        LogLevel::Error
    } else {
        LogLevel::from_verbosity(cli.verbose)
    };

    if let Err(e) = tracely_common_log::init(LogConfig::from_env().with_level(level)) {
        eprintln!("warning: {e}");
    }
}
