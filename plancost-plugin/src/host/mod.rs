//! Plugin process management.
//!
//! - [`launcher`] - Spawns plugins and establishes their transport

pub mod launcher;

pub use launcher::{
    PluginConnection, PluginLaunchConfig, PluginProcess, ProcessLauncher, TransportMode,
};
