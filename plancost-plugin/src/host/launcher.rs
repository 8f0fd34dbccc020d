//! Plugin process launcher.
//!
//! Starts a plugin executable and establishes its transport:
//!
//! - **TCP**: the plugin prints its listening port as the first line of
//!   stdout, then the host connects to `127.0.0.1:<port>`.
//! - **Stdio**: the plugin's stdin/stdout carry the RPC stream directly.
//!
//! Stderr, and any stdout after a TCP handshake, is forwarded to the debug
//! log under the plugin's name.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::LaunchError;
use crate::protocol::PORT_ENV_VAR;
use crate::rpc::RpcChannel;
use crate::settings::HostSettings;

/// Loopback address plugins listen on.
const LOOPBACK: &str = "127.0.0.1";

/// How long a plugin may take to exit on EOF before it is sent `SIGTERM`.
const EOF_SETTLE: Duration = Duration::from_millis(200);

// ============================================================================
// Transport Mode
// ============================================================================

/// How the host talks to a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransportMode {
    /// Port announced on stdout, RPC over a loopback socket.
    #[default]
    Tcp,
    /// RPC over the child's stdin/stdout.
    Stdio,
}

impl TransportMode {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Stdio => "stdio",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" | "" => Ok(Self::Tcp),
            "stdio" => Ok(Self::Stdio),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}

// ============================================================================
// Launch Config
// ============================================================================

/// Everything needed to start one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLaunchConfig {
    /// Configured plugin name.
    pub name: String,
    /// Installed version, when known.
    pub version: Option<String>,
    /// Executable path, or a bare name looked up on `PATH`.
    pub path: PathBuf,
    /// Extra command-line arguments.
    pub args: Vec<String>,
    /// Transport mode.
    pub transport: TransportMode,
}

impl PluginLaunchConfig {
    /// Creates a TCP launch config with no arguments.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: None,
            path: path.into(),
            args: Vec::new(),
            transport: TransportMode::Tcp,
        }
    }

    /// Sets the installed version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the command-line arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the transport mode.
    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }
}

// ============================================================================
// Plugin Connection
// ============================================================================

/// An established transport to a running plugin.
#[derive(Debug)]
pub enum PluginConnection {
    /// Loopback socket.
    Tcp(TcpStream),
    /// Child stdio pipes.
    Stdio {
        /// The child's stdin.
        stdin: ChildStdin,
        /// The child's stdout.
        stdout: ChildStdout,
    },
}

impl PluginConnection {
    /// Wraps the transport in an RPC channel.
    pub fn into_channel(self, label: &str) -> RpcChannel {
        match self {
            Self::Tcp(stream) => {
                let (reader, writer) = stream.into_split();
                RpcChannel::new(label, reader, writer)
            }
            Self::Stdio { stdin, stdout } => RpcChannel::new(label, stdout, stdin),
        }
    }
}

// ============================================================================
// Plugin Process
// ============================================================================

/// A running plugin child process.
#[derive(Debug)]
pub struct PluginProcess {
    name: String,
    child: Child,
    log_tasks: Vec<JoinHandle<()>>,
}

impl PluginProcess {
    /// Plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id, while the child is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Stops the plugin within `grace`, killing it if it will not exit.
    ///
    /// Callers close the RPC transport first so the plugin sees EOF and
    /// the `Shutdown` notification. A plugin still running after a short
    /// settle period gets `SIGTERM`, and one still running when `grace`
    /// runs out is killed.
    #[instrument(skip(self), fields(plugin = %self.name))]
    pub async fn shutdown(&mut self, grace: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + grace;

        if let Some(status) = self.wait_for(grace.min(EOF_SETTLE)).await {
            return Some(status);
        }

        self.terminate().await;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(status) = self.wait_for(remaining).await {
            return Some(status);
        }

        warn!(?grace, "Plugin did not exit in time, killing");
        self.kill().await
    }

    async fn wait_for(&mut self, limit: Duration) -> Option<ExitStatus> {
        match tokio::time::timeout(limit, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "Plugin exited");
                self.stop_log_tasks();
                Some(status)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to wait for plugin");
                None
            }
            Err(_) => None,
        }
    }

    /// Sends `SIGTERM` to the plugin.
    #[cfg(unix)]
    async fn terminate(&self) {
        let Some(pid) = self.child.id() else {
            return;
        };
        debug!(pid, "Sending SIGTERM");

        let sent = Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match sent {
            Ok(status) if status.success() => {}
            Ok(status) => debug!(pid, %status, "kill -TERM failed"),
            Err(e) => debug!(pid, error = %e, "Could not run kill"),
        }
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_async)]
    async fn terminate(&self) {}

    /// Kills the plugin immediately and reaps it.
    pub async fn kill(&mut self) -> Option<ExitStatus> {
        if let Err(e) = self.child.kill().await {
            debug!(plugin = %self.name, error = %e, "Kill failed");
        }
        self.stop_log_tasks();
        self.child.try_wait().ok().flatten()
    }

    fn stop_log_tasks(&mut self) {
        for task in self.log_tasks.drain(..) {
            task.abort();
        }
    }
}

// ============================================================================
// Launcher
// ============================================================================

/// Starts plugin processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    settings: HostSettings,
}

impl ProcessLauncher {
    /// Creates a launcher with the given settings.
    pub fn new(settings: HostSettings) -> Self {
        Self { settings }
    }

    /// Spawns the plugin and establishes its transport.
    ///
    /// On a failed handshake the child is killed before returning.
    #[instrument(skip(self, config), fields(plugin = %config.name, transport = %config.transport))]
    pub async fn launch(
        &self,
        config: &PluginLaunchConfig,
    ) -> Result<(PluginProcess, PluginConnection), LaunchError> {
        let path = resolve_executable(&config.path)?;
        debug!(path = %path.display(), args = ?config.args, "Spawning plugin");

        let start = Instant::now();
        let mut command = Command::new(&path);
        command
            .args(&config.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match config.transport {
            TransportMode::Tcp => {
                command.stdin(Stdio::null()).env(PORT_ENV_VAR, "0");
            }
            TransportMode::Stdio => {
                command.stdin(Stdio::piped());
            }
        }

        let mut child = command.spawn().map_err(|e| LaunchError::SpawnFailed {
            plugin: config.name.clone(),
            reason: e.to_string(),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| LaunchError::SpawnFailed {
            plugin: config.name.clone(),
            reason: "Failed to get stdout".to_string(),
        })?;

        let mut process = PluginProcess {
            name: config.name.clone(),
            log_tasks: Vec::new(),
            child,
        };

        if let Some(stderr) = process.child.stderr.take() {
            process
                .log_tasks
                .push(forward_lines(config.name.clone(), "stderr", stderr));
        }

        let connection = match config.transport {
            TransportMode::Stdio => {
                let stdin = process.child.stdin.take().ok_or_else(|| LaunchError::SpawnFailed {
                    plugin: config.name.clone(),
                    reason: "Failed to get stdin".to_string(),
                })?;
                PluginConnection::Stdio { stdin, stdout }
            }
            TransportMode::Tcp => match self.handshake(&config.name, stdout).await {
                Ok((stream, rest)) => {
                    process
                        .log_tasks
                        .push(forward_lines(config.name.clone(), "stdout", rest));
                    PluginConnection::Tcp(stream)
                }
                Err(e) => {
                    warn!(error = %e, "Plugin handshake failed");
                    process.kill().await;
                    return Err(e);
                }
            },
        };

        debug!(elapsed = ?start.elapsed(), pid = ?process.id(), "Plugin started");
        Ok((process, connection))
    }

    /// Reads the port line and connects to it.
    async fn handshake(
        &self,
        plugin: &str,
        stdout: ChildStdout,
    ) -> Result<(TcpStream, BufReader<ChildStdout>), LaunchError> {
        let timeout = self.settings.handshake_timeout;
        let deadline = Instant::now() + timeout;
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        let read = tokio::time::timeout(timeout, reader.read_line(&mut line))
            .await
            .map_err(|_| LaunchError::HandshakeTimeout {
                plugin: plugin.to_string(),
                timeout,
            })??;

        if read == 0 {
            return Err(LaunchError::Handshake {
                plugin: plugin.to_string(),
                reason: "plugin exited before announcing a port".to_string(),
            });
        }

        let port = parse_port(&line).ok_or_else(|| LaunchError::Handshake {
            plugin: plugin.to_string(),
            reason: format!("expected a port number, got {:?}", line.trim()),
        })?;
        debug!(port, "Plugin announced port");

        let remaining = deadline.saturating_duration_since(Instant::now());
        let stream = match tokio::time::timeout(remaining, TcpStream::connect((LOOPBACK, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(LaunchError::Connect {
                    plugin: plugin.to_string(),
                    port,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(LaunchError::HandshakeTimeout {
                    plugin: plugin.to_string(),
                    timeout,
                });
            }
        };

        Ok((stream, reader))
    }
}

/// Parses a handshake line into a port in `1..=65535`.
pub fn parse_port(line: &str) -> Option<u16> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u16>().ok().filter(|port| *port != 0)
}

/// Uses the path as-is when it exists, otherwise searches `PATH`.
fn resolve_executable(path: &Path) -> Result<PathBuf, LaunchError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    which::which(path).map_err(|_| {
        warn!(path = %path.display(), "Plugin executable not found");
        LaunchError::NotFound(path.display().to_string())
    })
}

/// Forwards each line of a child stream to the debug log.
fn forward_lines<R>(plugin: String, stream: &'static str, reader: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(plugin = %plugin, stream, "{line}");
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
