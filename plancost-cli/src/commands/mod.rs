//! CLI command implementations.

pub mod actual;
pub mod plugins;
pub mod pricing;
pub mod projected;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use plancost_core::ResourceDescriptor;
use plancost_engine::{Engine, EngineConfig, SpecLoader, SpecStore, filter_resources};
use plancost_plugin::{ClientRegistry, HostSettings, default_plugin_dir, discover_plugins};

use crate::Cli;

#[derive(Deserialize)]
#[serde(untagged)]
enum ResourceFile {
    List(Vec<ResourceDescriptor>),
    Wrapped { resources: Vec<ResourceDescriptor> },
}

/// Reads resource descriptors from a JSON file and applies the CLI filter.
///
/// The file holds a list of descriptors or an object with a `resources` list.
pub fn load_resources(path: &Path, filter: Option<&str>) -> Result<Vec<ResourceDescriptor>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: ResourceFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let resources = match parsed {
        ResourceFile::List(resources) | ResourceFile::Wrapped { resources } => resources,
    };

    Ok(match filter {
        Some(expr) => filter_resources(&resources, expr),
        None => resources,
    })
}

/// The plugin directory from the CLI, or the default.
pub fn plugin_dir(cli: &Cli) -> Option<PathBuf> {
    cli.plugin_dir.clone().or_else(default_plugin_dir)
}

/// Host settings from CLI flags.
pub fn host_settings(cli: &Cli) -> HostSettings {
    HostSettings::default()
        .with_handshake_timeout(Duration::from_secs(cli.handshake_timeout))
        .with_request_timeout(Duration::from_secs(cli.request_timeout))
}

/// Plugins and specs loaded for one command.
pub struct Session {
    /// Engine over the loaded plugins and specs.
    pub engine: Engine,
    registry: Arc<ClientRegistry>,
}

impl Session {
    /// Discovers and launches plugins, loads specs, and builds the engine.
    pub async fn start(cli: &Cli) -> Result<Self> {
        let plugins = match plugin_dir(cli) {
            Some(dir) => discover_plugins(&dir)
                .with_context(|| format!("Failed to scan plugin directory {}", dir.display()))?,
            None => Vec::new(),
        };
        debug!(count = plugins.len(), "Discovered plugins");

        let report = ClientRegistry::launch_all(&plugins, &host_settings(cli)).await;
        for failure in &report.failures {
            warn!(plugin = %failure.name, error = %failure.error, "Plugin unavailable");
        }
        let registry = Arc::new(report.registry);

        let specs = match &cli.spec_dir {
            Some(dir) => SpecLoader::new(dir).load()?,
            None => SpecStore::new(),
        };

        let mut config = EngineConfig::default().with_max_concurrency(cli.max_concurrency);
        if let Some(secs) = cli.query_timeout {
            config = config.with_query_timeout(Duration::from_secs(secs));
        }

        let engine = Engine::new(registry.clone())
            .with_specs(specs)
            .with_config(config);

        Ok(Self { engine, registry })
    }

    /// Shuts down every plugin.
    pub async fn close(self) {
        self.registry.close_all().await;
    }
}
