//! Command implementations.

mod dashboard;
mod report;
mod seed;
mod sign;

pub use dashboard::{DashboardAction, DashboardCommand};
pub use report::{ReportAction, ReportCommand};
pub use seed::{active_plan, error_plan, SeedCommand, SeedOutput, ERROR_CATALOGUE, SEED_PAGES};
pub use sign::{SignCommand, SignOutput};
