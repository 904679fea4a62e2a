//! Dashboard command implementation.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracely_dashboard::{
    resolve_current_app, AppInfo, DashboardClient, ErrorListResponse, ErrorQuery, OverviewResponse,
    SessionStore, StatsQuery, StatsResponse,
};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput, StatusOutput};

/// Query the dashboard API
#[derive(Debug, Parser)]
pub struct DashboardCommand {
    #[command(subcommand)]
    pub action: DashboardAction,
}

#[derive(Debug, Subcommand)]
pub enum DashboardAction {
    /// Sign in and remember the session token
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "TRACELY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Today's traffic and error summary
    Overview,

    /// Aggregated error list
    Errors {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = ErrorQuery::DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Only errors of this type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// Daily page views and top pages
    Stats {
        /// Days to cover (1-30)
        #[arg(long, default_value_t = StatsQuery::DEFAULT_DAYS)]
        days: u32,

        /// Application to query. The selected application takes precedence.
        #[arg(long)]
        app_id: Option<String>,
    },

    /// List applications and select one if none is selected yet
    Apps,

    /// Select the application subsequent queries apply to
    Use {
        app_id: String,
    },
}

impl DashboardCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let client = DashboardClient::new(
            &ctx.settings.dashboard.base_url,
            SessionStore::new(ctx.open_store()?),
        )?;

        match &self.action {
            DashboardAction::Login { username, password } => {
                let response = client.login(username, password).await?;
                print_output(ctx, &StatusOutput::success(format!("Logged in as {}", response.username)))
            }
            DashboardAction::Logout => {
                client.logout()?;
                print_output(ctx, &StatusOutput::success("Logged out"))
            }
            DashboardAction::Overview => {
                let overview = client.overview().await?;
                print_output(ctx, &overview)
            }
            DashboardAction::Errors { page, page_size, kind } => {
                let query = ErrorQuery {
                    page: *page,
                    page_size: *page_size,
                    kind: kind.clone(),
                };
                let errors = client.errors(&query).await?;
                print_output(ctx, &ErrorsOutput { query, errors })
            }
            DashboardAction::Stats { days, app_id } => {
                let query = StatsQuery {
                    days: *days,
                    app_id: app_id.clone(),
                };
                let stats = client.stats(&query).await?;
                print_output(ctx, &stats)
            }
            DashboardAction::Apps => {
                let apps = client.apps().await?;
                let current = sync_current_app(&client, &apps)?;
                print_output(ctx, &AppsOutput { current, apps })
            }
            DashboardAction::Use { app_id } => {
                let apps = client.apps().await?;
                if !apps.iter().any(|app| &app.app_id == app_id) {
                    return Err(CliError::not_found_with_suggestions(
                        format!("Application not found: {app_id}"),
                        apps.iter().map(|app| app.app_id.clone()).collect(),
                    ));
                }
                client.select_app(app_id)?;
                print_output(ctx, &StatusOutput::success(format!("Now using {app_id}")))
            }
        }
    }
}

/// Keep the saved selection if it is still listed, otherwise switch to the
/// first application and persist that.
fn sync_current_app(client: &DashboardClient, apps: &[AppInfo]) -> Result<Option<String>, CliError> {
    let saved = client.session().current_app()?;
    let current = resolve_current_app(apps, saved.as_deref());

    if let Some(app_id) = current.as_deref() {
        if saved.as_deref() != Some(app_id) {
            tracing::info!(app_id, "selecting application");
            client.select_app(app_id)?;
        }
    }
    Ok(current)
}

impl FormattedOutput for OverviewResponse {
    fn format_text(&self) -> String {
        let mut out = format!(
            "Page views today:  {}\nVisitors today:    {}\nErrors today:      {}\nErrors total:      {}",
            self.today_pv, self.today_uv, self.today_errors, self.total_errors
        );
        if !self.top_errors.is_empty() {
            out.push_str("\n\nTop errors:");
            for error in &self.top_errors {
                out.push_str(&format!("\n  {:>6}  {}  {}", error.count, error.kind, error.message));
            }
        }
        if !self.error_trend.is_empty() {
            out.push_str("\n\nError trend:");
            for point in &self.error_trend {
                out.push_str(&format!("\n  {}  {}", point.date, point.count));
            }
        }
        out
    }
}

#[derive(Debug, Serialize)]
struct ErrorsOutput {
    #[serde(skip)]
    query: ErrorQuery,
    #[serde(flatten)]
    errors: ErrorListResponse,
}

impl FormattedOutput for ErrorsOutput {
    fn format_text(&self) -> String {
        if self.errors.list.is_empty() {
            return "No errors recorded".to_string();
        }

        let mut out = format!(
            "{} errors (page {}, {} per page)",
            self.errors.total,
            self.query.page.max(1),
            self.query.page_size.clamp(1, ErrorQuery::MAX_PAGE_SIZE)
        );
        for error in &self.errors.list {
            out.push_str(&format!(
                "\n  #{:<5} {:>6}x  {}  {}",
                error.id, error.count, error.kind, error.message
            ));
            if !error.url.is_empty() {
                out.push_str(&format!("\n          {}", error.url));
            }
        }
        out
    }
}

impl FormattedOutput for StatsResponse {
    fn format_text(&self) -> String {
        let mut out = String::from("Daily traffic:");
        if self.daily.is_empty() {
            out.push_str("\n  (none)");
        }
        for day in &self.daily {
            out.push_str(&format!("\n  {}  pv {:>6}  uv {:>6}", day.date, day.pv, day.uv));
        }
        if !self.top_pages.is_empty() {
            out.push_str("\n\nTop pages:");
            for page in &self.top_pages {
                out.push_str(&format!(
                    "\n  {:>6}  {:>7.1}s  {}",
                    page.pv, page.avg_duration, page.page
                ));
            }
        }
        out
    }
}

#[derive(Debug, Serialize)]
struct AppsOutput {
    current: Option<String>,
    apps: Vec<AppInfo>,
}

impl FormattedOutput for AppsOutput {
    fn format_text(&self) -> String {
        if self.apps.is_empty() {
            return "No applications registered".to_string();
        }
        self.apps
            .iter()
            .map(|app| {
                let marker = if self.current.as_deref() == Some(app.app_id.as_str()) {
                    '*'
                } else {
                    ' '
                };
                format!("{marker} {}  {}", app.app_id, app.app_name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
