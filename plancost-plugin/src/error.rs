//! Plugin host error types.

use std::time::Duration;
use thiserror::Error;

/// JSON-RPC error code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;

// ============================================================================
// Launch Error
// ============================================================================

/// Error starting a plugin process or establishing its channel.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Plugin executable not found.
    #[error("Plugin executable not found: {0}")]
    NotFound(String),

    /// Failed to spawn the plugin process.
    #[error("Failed to spawn plugin {plugin}: {reason}")]
    SpawnFailed {
        /// Plugin name.
        plugin: String,
        /// Underlying failure.
        reason: String,
    },

    /// The plugin announced something other than a port.
    #[error("Handshake with {plugin} failed: {reason}")]
    Handshake {
        /// Plugin name.
        plugin: String,
        /// What went wrong.
        reason: String,
    },

    /// The plugin did not announce a port in time.
    #[error("Handshake with {plugin} timed out after {timeout:?}")]
    HandshakeTimeout {
        /// Plugin name.
        plugin: String,
        /// The handshake timeout.
        timeout: Duration,
    },

    /// The announced port could not be reached.
    #[error("Failed to connect to {plugin} on port {port}: {reason}")]
    Connect {
        /// Plugin name.
        plugin: String,
        /// Announced port.
        port: u16,
        /// Underlying failure.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// RPC Error
// ============================================================================

/// Error on the JSON-RPC channel.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No response within the call timeout.
    #[error("RPC call timed out after {0:?}")]
    Timeout(Duration),

    /// The channel closed before a response arrived.
    #[error("RPC connection closed")]
    ConnectionClosed,

    /// The plugin answered with a JSON-RPC error object.
    #[error("RPC error ({code}): {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The response carried neither a result nor an error.
    #[error("RPC returned empty response")]
    EmptyResponse,

    /// Request or response (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpcError {
    /// Returns true if the plugin does not implement the method.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Self::Remote { code, .. } if *code == METHOD_NOT_FOUND)
    }

    /// Returns true for timeouts and closed channels.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConnectionClosed)
    }
}

// ============================================================================
// Plugin Error
// ============================================================================

/// Error surfaced by a plugin client or the registry.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin could not be started.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// An RPC call failed.
    #[error("{plugin}.{method} failed: {source}")]
    Rpc {
        /// Plugin name.
        plugin: String,
        /// RPC method.
        method: &'static str,
        /// Underlying RPC failure.
        #[source]
        source: RpcError,
    },

    /// The plugin does not implement an optional method.
    #[error("{plugin} does not implement {method}")]
    Unimplemented {
        /// Plugin name.
        plugin: String,
        /// RPC method.
        method: &'static str,
    },

    /// The plugin answered with data that cannot be used.
    #[error("Invalid response from {plugin}: {reason}")]
    InvalidResponse {
        /// Plugin name.
        plugin: String,
        /// What was wrong.
        reason: String,
    },

    /// The client was already closed.
    #[error("Plugin {0} is closed")]
    Closed(String),

    /// A plugin with this name is already registered.
    #[error("Duplicate plugin name: {0}")]
    DuplicateName(String),
}

impl PluginError {
    /// Wraps an RPC error, classifying unknown methods as [`PluginError::Unimplemented`].
    pub fn rpc(plugin: &str, method: &'static str, source: RpcError) -> Self {
        if source.is_unimplemented() {
            Self::Unimplemented {
                plugin: plugin.to_string(),
                method,
            }
        } else {
            Self::Rpc {
                plugin: plugin.to_string(),
                method,
                source,
            }
        }
    }

    /// Returns true if the method is not implemented by the plugin.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Self::Unimplemented { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
