//! Seed command implementation.
//!
//! Fills a local collector with activity records for a fixed page list and
//! then error records for a fixed catalogue. Requests are paced to stay under
//! the collector's 60 requests/minute limit.

use std::time::Duration;

use clap::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tracely_common_config::{validate_sdk, TracelyConfig};
use tracely_common_core::{SharedClock, SystemClock};
use tracely_common_http::HttpClient;
use tracely_common_log::spans::Timer;
use tracely_sdk::{signed_fetch, ActivePayload, Endpoint, ErrorData, ErrorKind};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

pub const DEV_APP_ID: &str = "my-app-id";
pub const DEV_APP_SECRET: &str = "my-app-secret-please-change-this-to-32-chars";
pub const DEV_HOST: &str = "http://localhost:3001";

/// Origin the generated error URLs point at.
const PAGE_ORIGIN: &str = "http://localhost:3000";

pub const SEED_PAGES: [&str; 8] = [
    "/dashboard",
    "/dashboard/overview",
    "/dashboard/errors",
    "/dashboard/active",
    "/dashboard/settings",
    "/dashboard/users",
    "/dashboard/reports",
    "/dashboard/analytics",
];

pub const ERROR_CATALOGUE: [(&str, &str); 10] = [
    ("jsError", "Uncaught TypeError: Cannot read property \"name\" of undefined"),
    ("jsError", "Uncaught ReferenceError: variable is not defined"),
    ("jsError", "Uncaught SyntaxError: Unexpected token"),
    ("promiseError", "Promise rejected: Network timeout"),
    ("promiseError", "Promise rejected: API response 500"),
    ("promiseError", "Promise rejected: Connection refused"),
    ("manualError", "User action failed: submit form"),
    ("manualError", "Validation failed: email format invalid"),
    ("resourceError", "Failed to load resource: net::ERR_FAILED"),
    ("apiError", "API Error: /api/users returned 403"),
];

/// Fill a collector with test activity and error data
#[derive(Debug, Parser)]
pub struct SeedCommand {
    /// Application id. Falls back to the configured one, then the dev default.
    #[arg(long)]
    pub app_id: Option<String>,

    /// Application secret. Falls back to the configured one, then the dev default.
    #[arg(long, hide_env_values = true, env = "TRACELY_SEED_SECRET")]
    pub app_secret: Option<String>,

    /// Collector URL. Falls back to the configured one, then the dev default.
    #[arg(long)]
    pub host: Option<String>,

    /// Activity records per page
    #[arg(long, default_value_t = 20)]
    pub per_page: usize,

    /// Reports per catalogue error
    #[arg(long, default_value_t = 10)]
    pub per_error: usize,

    /// Pause after each activity record (ms)
    #[arg(long, default_value_t = 120)]
    pub active_delay_ms: u64,

    /// Pause after each error record (ms)
    #[arg(long, default_value_t = 1200)]
    pub error_delay_ms: u64,

    /// Skip the activity phase
    #[arg(long)]
    pub skip_active: bool,

    /// Skip the error phase
    #[arg(long)]
    pub skip_errors: bool,
}

/// Delivery counts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedOutput {
    pub active_sent: usize,
    pub active_failed: usize,
    pub errors_sent: usize,
    pub errors_failed: usize,
}

impl SeedOutput {
    fn attempted(&self) -> usize {
        self.active_sent + self.active_failed + self.errors_sent + self.errors_failed
    }

    fn delivered(&self) -> usize {
        self.active_sent + self.errors_sent
    }
}

impl FormattedOutput for SeedOutput {
    fn format_text(&self) -> String {
        format!(
            "✓ Seeding finished: {} activity records ({} failed), {} error records ({} failed)",
            self.active_sent, self.active_failed, self.errors_sent, self.errors_failed
        )
    }
}

/// `per_page` activity records for every page, each from a fresh random user
/// with a dwell time between 10 and 309 seconds.
pub fn active_plan<R: Rng>(rng: &mut R, app_id: &str, pages: &[&str], per_page: usize) -> Vec<ActivePayload> {
    pages
        .iter()
        .flat_map(|page| std::iter::repeat(*page).take(per_page))
        .map(|page| ActivePayload {
            app_id: app_id.to_string(),
            user_id: random_user_id(rng),
            page: page.to_string(),
            duration: rng.gen_range(10..310),
        })
        .collect()
}

/// `per_error` records for every catalogue entry, each on a random page.
pub fn error_plan<R: Rng>(
    rng: &mut R,
    catalogue: &[(&str, &str)],
    pages: &[&str],
    per_error: usize,
) -> Vec<ErrorData> {
    catalogue
        .iter()
        .flat_map(|entry| std::iter::repeat(*entry).take(per_error))
        .map(|(kind, message)| {
            let page = if pages.is_empty() {
                ""
            } else {
                pages[rng.gen_range(0..pages.len())]
            };
            let stack = kind
                .contains("Error")
                .then(|| format!("Error: {message}\n    at test.js:1:1"));
            ErrorData::new(ErrorKind::from(kind), message, format!("{PAGE_ORIGIN}{page}"))
                .with_stack(stack)
        })
        .collect()
}

fn random_user_id<R: Rng>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(22)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

impl SeedCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let config = self.resolve_config(ctx)?;
        let http = ctx.http_client()?;
        let clock = SystemClock::shared();

        let (active, errors) = {
            let mut rng = rand::thread_rng();
            let active = if self.skip_active {
                Vec::new()
            } else {
                active_plan(&mut rng, &config.app_id, &SEED_PAGES, self.per_page)
            };
            let errors = if self.skip_errors {
                Vec::new()
            } else {
                error_plan(&mut rng, &ERROR_CATALOGUE, &SEED_PAGES, self.per_error)
            };
            (active, errors)
        };

        tracing::info!(
            app_id = %config.app_id,
            host = %config.host,
            active = active.len(),
            errors = errors.len(),
            "seeding test data"
        );
        let timer = Timer::start("seed");
        let mut output = SeedOutput::default();

        for payload in &active {
            if signed_fetch(&http, &config, &clock, Endpoint::Active.path(), payload).await {
                tracing::info!(page = %payload.page, duration = payload.duration, "activity record sent");
                output.active_sent += 1;
            } else {
                output.active_failed += 1;
            }
            pause(self.active_delay_ms).await;
        }

        for data in &errors {
            if send_error(&http, &config, &clock, data).await {
                output.errors_sent += 1;
            } else {
                output.errors_failed += 1;
            }
            pause(self.error_delay_ms).await;
        }

        timer.finish();

        if output.attempted() > 0 && output.delivered() == 0 {
            return Err(CliError::network(
                "The collector accepted none of the seed reports",
                config.host.clone(),
            ));
        }

        print_output(ctx, &output)
    }

    /// Flags first, then configuration, then the local development defaults.
    fn resolve_config(&self, ctx: &CommandContext) -> Result<TracelyConfig, CliError> {
        let configured = &ctx.settings.sdk;

        let app_id = pick(self.app_id.as_deref(), &configured.app_id, DEV_APP_ID);
        let host = pick(self.host.as_deref(), &configured.host, DEV_HOST);
        let secret = pick(self.app_secret.as_deref(), configured.app_secret.expose(), DEV_APP_SECRET);

        let config = TracelyConfig::new(app_id, secret, host).with_timestamp_unit(configured.timestamp_unit);
        validate_sdk(&config)?;
        Ok(config)
    }
}

fn pick(flag: Option<&str>, configured: &str, fallback: &str) -> String {
    flag.filter(|v| !v.is_empty())
        .or(Some(configured).filter(|v| !v.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

async fn send_error(http: &HttpClient, config: &TracelyConfig, clock: &SharedClock, data: &ErrorData) -> bool {
    let sent = signed_fetch(http, config, clock, Endpoint::Error.path(), data).await;
    if sent {
        tracing::info!(kind = %data.kind, message = %data.message, "error record sent");
    }
    sent
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
