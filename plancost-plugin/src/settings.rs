//! Plugin host settings.

use std::time::Duration;

// ============================================================================
// Host Settings
// ============================================================================

/// Timeouts governing plugin processes and RPC calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// How long a TCP plugin may take to announce its port.
    pub handshake_timeout: Duration,
    /// Timeout for each cost RPC.
    pub request_timeout: Duration,
    /// Timeout for the metadata calls made while connecting.
    pub probe_timeout: Duration,
    /// How long a plugin may take to exit before it is killed.
    pub shutdown_grace: Duration,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl HostSettings {
    /// Sets the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the metadata probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
