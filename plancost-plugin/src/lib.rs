// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # plancost Plugin
//!
//! Plugin host for plancost: starts pricing plugins as child processes and
//! talks to them over JSON-RPC.
//!
//! ## Host
//!
//! - [`host::launcher`] - Spawns a plugin and performs the TCP port handshake
//! - [`rpc`] - Multiplexed JSON-RPC channel over stdio or TCP
//! - [`discovery`] - Finds installed plugins on disk
//!
//! ## Clients
//!
//! - [`source::CostSource`] - Trait for anything that prices resources
//! - [`client::PluginClient`] - A launched plugin implementing `CostSource`
//! - [`registry::ClientRegistry`] - Ordered, uniquely named sources
//!
//! ## Example
//!
//! ```ignore
//! use plancost_plugin::{ClientRegistry, HostSettings, discover_plugins};
//!
//! let plugins = discover_plugins(&root)?;
//! let report = ClientRegistry::launch_all(&plugins, &HostSettings::default()).await;
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.name, failure.error);
//! }
//! let registry = report.registry;
//! // ... hand the registry to the engine ...
//! registry.close_all().await;
//! ```

pub mod client;
pub mod discovery;
pub mod error;
pub mod host;
pub mod protocol;
pub mod registry;
pub mod rpc;
pub mod settings;
pub mod source;

// Errors
pub use error::{LaunchError, METHOD_NOT_FOUND, PluginError, RpcError};

// Host
pub use discovery::{default_plugin_dir, discover_plugins};
pub use host::{PluginConnection, PluginLaunchConfig, PluginProcess, ProcessLauncher, TransportMode};
pub use rpc::RpcChannel;
pub use settings::HostSettings;

// Protocol
pub use protocol::{PluginInfo, SPEC_VERSION, SupportsResponse};

// Clients
pub use client::{PluginClient, PluginMetadata, is_spec_compatible};
pub use registry::{ClientRegistry, LaunchReport, LoadFailure};
pub use source::{ActualCostRequest, CostSource};
