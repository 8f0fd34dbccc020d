//! Pricing command - show the pricing spec behind each resource.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{Session, load_resources};
use crate::output::{JsonFormatter, PricingRow, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the pricing command.
#[derive(Args)]
pub struct PricingArgs {
    /// JSON file of resource descriptors.
    #[arg(long, short)]
    pub resources: PathBuf,
}

/// Runs the pricing command.
pub async fn run(args: &PricingArgs, cli: &Cli) -> Result<ExitCode> {
    let resources = load_resources(&args.resources, cli.filter.as_deref())?;
    let session = Session::start(cli).await?;

    let mut rows = Vec::with_capacity(resources.len());
    let mut failure = None;
    for resource in &resources {
        match session.engine.get_pricing_spec(resource).await {
            Ok(spec) => rows.push(PricingRow {
                resource_id: resource.id().to_string(),
                resource_type: resource.resource_type().to_string(),
                spec,
            }),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    session.close().await;
    if let Some(e) = failure {
        return Err(e.into());
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_pricing(&rows));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_pricing(&rows)?);
        }
    }

    Ok(ExitCode::Success)
}
