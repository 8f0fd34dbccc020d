//! Installed plugin discovery.
//!
//! Plugins are installed as `<root>/<name>/<version>/<executable>`. The
//! executable is named `<name>` or `plancost-plugin-<name>`. A
//! `plugin.transport` file next to it containing `stdio` selects the stdio
//! transport; TCP is the default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::host::launcher::{PluginLaunchConfig, TransportMode};

/// Prefix of conventionally named plugin executables.
pub const EXECUTABLE_PREFIX: &str = "plancost-plugin-";

/// File selecting the transport mode.
pub const TRANSPORT_FILE: &str = "plugin.transport";

/// Returns `~/.plancost/plugins`.
pub fn default_plugin_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".plancost").join("plugins"))
}

/// Scans `root` for installed plugins, sorted by name.
///
/// A missing root yields no plugins. Plugins without a usable version or
/// executable are skipped with a warning.
pub fn discover_plugins(root: &Path) -> io::Result<Vec<PluginLaunchConfig>> {
    if !root.is_dir() {
        debug!(root = %root.display(), "Plugin directory does not exist");
        return Ok(Vec::new());
    }

    let mut plugins = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        match discover_plugin(&name, &entry.path()) {
            Ok(Some(config)) => plugins.push(config),
            Ok(None) => warn!(plugin = %name, "No installed version with an executable"),
            Err(e) => warn!(plugin = %name, error = %e, "Failed to scan plugin directory"),
        }
    }

    plugins.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(root = %root.display(), count = plugins.len(), "Discovered plugins");
    Ok(plugins)
}

fn discover_plugin(name: &str, dir: &Path) -> io::Result<Option<PluginLaunchConfig>> {
    let mut versions: Vec<(semver::Version, String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let raw = entry.file_name().to_string_lossy().into_owned();
        match semver::Version::parse(raw.trim_start_matches('v')) {
            Ok(version) => versions.push((version, raw, entry.path())),
            Err(_) => debug!(plugin = %name, version = %raw, "Skipping non-semver directory"),
        }
    }

    // Highest version first; fall back to older ones missing an executable.
    versions.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, raw, version_dir) in versions {
        if let Some(executable) = find_executable(name, &version_dir) {
            let transport = read_transport(&version_dir);
            return Ok(Some(
                PluginLaunchConfig::new(name, executable)
                    .with_version(raw)
                    .with_transport(transport),
            ));
        }
        debug!(plugin = %name, version = %raw, "Version directory has no executable");
    }

    Ok(None)
}

fn find_executable(name: &str, dir: &Path) -> Option<PathBuf> {
    let candidates = [name.to_string(), format!("{EXECUTABLE_PREFIX}{name}")];
    candidates.iter().find_map(|candidate| {
        [candidate.clone(), format!("{candidate}.exe")]
            .into_iter()
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
    })
}

fn read_transport(dir: &Path) -> TransportMode {
    let path = dir.join(TRANSPORT_FILE);
    let Ok(content) = fs::read_to_string(&path) else {
        return TransportMode::Tcp;
    };
    content.parse().unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Invalid transport file, using tcp");
        TransportMode::Tcp
    })
}

// ============================================================================
// Tests
// ============================================================================
