// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! plancost CLI - cost estimates for infrastructure plans.
//!
//! # Examples
//!
//! ```bash
//! # Projected monthly cost of the resources in a plan
//! plancost projected --resources plan.json
//!
//! # Only EC2 resources, grouped by type
//! plancost --filter type=ec2 projected --resources plan.json --group-by type
//!
//! # Actual cost for January as a daily time series
//! plancost actual --resources plan.json --from 2024-01-01 --to 2024-01-31 --group-by daily
//!
//! # Pricing specs for each resource
//! plancost pricing --resources plan.json
//!
//! # Installed plugins and their protocol versions
//! plancost plugins
//!
//! # JSON output
//! plancost --format json --pretty projected --resources plan.json
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{actual, plugins, pricing, projected};

// ============================================================================
// CLI Definition
// ============================================================================

/// plancost CLI - plugin-driven cost estimation.
#[derive(Parser)]
#[command(name = "plancost")]
#[command(about = "Cost estimates for infrastructure-as-code plans")]
#[command(long_about = r#"
plancost prices the resources of an infrastructure plan by asking installed
pricing plugins, falling back to local pricing spec files when no plugin
answers.

Plugins live under ~/.plancost/plugins/<name>/<version>/.

Filters:
  type=<text>          resource type contains text (any case)
  provider=<text>      provider contains text (any case)
  tag:<key>=<value>    tag equals value

Examples:
  plancost projected --resources plan.json
  plancost actual --resources plan.json --from 2024-01-01 --to 2024-01-31
  plancost plugins
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Plugin directory (defaults to ~/.plancost/plugins).
    #[arg(long, global = true, env = "PLANCOST_PLUGIN_DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Directory of local pricing spec files.
    #[arg(long, global = true, env = "PLANCOST_SPEC_DIR")]
    pub spec_dir: Option<PathBuf>,

    /// Resource filter expression.
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Seconds to wait for a plugin to announce its port.
    #[arg(long, global = true, default_value = "10", env = "PLANCOST_HANDSHAKE_TIMEOUT")]
    pub handshake_timeout: u64,

    /// Seconds to wait for a single plugin call.
    #[arg(long, global = true, default_value = "30", env = "PLANCOST_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Seconds allowed for a whole query (unbounded if unset).
    #[arg(long, global = true, env = "PLANCOST_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Resources priced concurrently.
    #[arg(long, global = true, default_value = "16", env = "PLANCOST_MAX_CONCURRENCY")]
    pub max_concurrency: usize,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Estimate projected monthly cost.
    #[command(visible_alias = "p")]
    Projected(projected::ProjectedArgs),

    /// Report actual historical cost.
    #[command(visible_alias = "a")]
    Actual(actual::ActualArgs),

    /// Show the pricing spec used for each resource.
    Pricing(pricing::PricingArgs),

    /// List installed plugins.
    Plugins,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Completed, but some resources could not be priced.
    PartialFailure = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("plancost=debug,plancost_plugin=debug,plancost_engine=debug,info")
    } else {
        EnvFilter::new("plancost=warn,plancost_plugin=warn,plancost_engine=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Projected(args) => projected::run(args, &cli).await,
        Commands::Actual(args) => actual::run(args, &cli).await,
        Commands::Pricing(args) => pricing::run(args, &cli).await,
        Commands::Plugins => plugins::run(&cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
