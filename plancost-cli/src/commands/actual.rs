//! Actual command - report historical cost.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use plancost_core::{GroupBy, TimeRange};

use super::projected::{exit_code, print_report};
use super::{Session, load_resources};
use crate::Cli;
use crate::ExitCode;
use crate::output::{CostReport, ReportKind};

/// Arguments for the actual command.
#[derive(Args)]
pub struct ActualArgs {
    /// JSON file of resource descriptors.
    #[arg(long, short)]
    pub resources: PathBuf,

    /// Start of the period (`YYYY-MM-DD` or RFC 3339).
    #[arg(long, value_parser = parse_time)]
    pub from: DateTime<Utc>,

    /// End of the period (`YYYY-MM-DD` or RFC 3339).
    #[arg(long, value_parser = parse_time)]
    pub to: DateTime<Utc>,

    /// Group by resource, type, or provider, or build a daily or monthly
    /// time series across providers.
    #[arg(long, short)]
    pub group_by: Option<GroupBy>,
}

/// Parses a date or an RFC 3339 timestamp.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected YYYY-MM-DD or RFC 3339, got {s:?}: {e}"))
}

/// Runs the actual command.
pub async fn run(args: &ActualArgs, cli: &Cli) -> Result<ExitCode> {
    let range = TimeRange::new(args.from, args.to)?;
    let resources = load_resources(&args.resources, cli.filter.as_deref())?;
    info!(resources = resources.len(), from = %range.start, to = %range.end, "Fetching actual cost");

    let session = Session::start(cli).await?;
    let outcome = session.engine.get_actual_cost(&resources, range).await;
    session.close().await;
    let batch = outcome?;

    let mut report = CostReport::new(ReportKind::Actual, batch);
    if let Some(group_by) = args.group_by {
        report.group(group_by);
    }

    print_report(&report, cli)?;
    Ok(exit_code(&report))
}
