//! Plugins command - list installed plugins.

use anyhow::Result;
use tracing::info;

use plancost_plugin::{PluginClient, discover_plugins};

use super::{host_settings, plugin_dir};
use crate::output::{JsonFormatter, PluginRow, PluginStatus, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the plugins command.
///
/// Each plugin is started, asked for its metadata, and shut down again.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let Some(dir) = plugin_dir(cli) else {
        anyhow::bail!("No plugin directory: pass --plugin-dir or set PLANCOST_PLUGIN_DIR");
    };
    info!(dir = %dir.display(), "Listing plugins");

    let settings = host_settings(cli);
    let mut rows = Vec::new();
    for config in discover_plugins(&dir)? {
        let status = match PluginClient::launch(&config, &settings).await {
            Ok(client) => {
                let metadata = client.metadata().clone();
                client.close().await;
                PluginStatus::Loaded(metadata)
            }
            Err(e) => PluginStatus::Failed(e.to_string()),
        };
        rows.push(PluginRow { config, status });
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_plugins_header());
            println!("{}", "─".repeat(70));
            for row in &rows {
                println!("{}", formatter.format_plugin_line(row));
            }

            let loaded = rows
                .iter()
                .filter(|r| matches!(r.status, PluginStatus::Loaded(_)))
                .count();
            println!();
            println!("Total: {} plugins ({loaded} loaded) in {}", rows.len(), dir.display());
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_plugins(&rows)?);
        }
    }

    Ok(ExitCode::Success)
}
