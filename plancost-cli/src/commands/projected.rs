//! Projected command - estimate monthly cost.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use plancost_core::GroupBy;

use super::{Session, load_resources};
use crate::output::{CostReport, JsonFormatter, ReportKind, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the projected command.
#[derive(Args)]
pub struct ProjectedArgs {
    /// JSON file of resource descriptors.
    #[arg(long, short)]
    pub resources: PathBuf,

    /// Group results by resource, type, or provider.
    #[arg(long, short)]
    pub group_by: Option<GroupBy>,
}

/// Runs the projected command.
pub async fn run(args: &ProjectedArgs, cli: &Cli) -> Result<ExitCode> {
    let resources = load_resources(&args.resources, cli.filter.as_deref())?;
    info!(resources = resources.len(), "Estimating projected cost");

    let session = Session::start(cli).await?;
    let outcome = session.engine.get_projected_cost(&resources).await;
    session.close().await;
    let batch = outcome?;

    let mut report = CostReport::new(ReportKind::Projected, batch);
    if let Some(group_by) = args.group_by {
        report.group(group_by);
    }

    print_report(&report, cli)?;
    Ok(exit_code(&report))
}

/// Prints a report in the selected format.
pub fn print_report(report: &CostReport, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_report(report));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_report(report)?);
        }
    }
    Ok(())
}

/// Partial failure when any resource could not be priced or the grouping
/// could not be built.
pub fn exit_code(report: &CostReport) -> ExitCode {
    if report.is_partial() {
        ExitCode::PartialFailure
    } else {
        ExitCode::Success
    }
}
