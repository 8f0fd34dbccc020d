//! Multiplexed JSON-RPC channel.
//!
//! A [`RpcChannel`] wraps any byte stream pair (child stdio or a TCP socket)
//! and lets many callers issue requests concurrently. A writer task owns the
//! write half; a reader task owns the read half and routes each response to
//! its caller by request id.
//!
//! Dropping a pending [`RpcChannel::call`] future removes its waiter, so a
//! response that arrives after the caller gave up is discarded. When the
//! peer closes the stream, every pending call fails with
//! [`RpcError::ConnectionClosed`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::RpcError;

/// Capacity of the outgoing message queue.
const WRITER_QUEUE: usize = 64;

// ============================================================================
// JSON-RPC Messages
// ============================================================================

/// JSON-RPC request message.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: T,
}

/// JSON-RPC notification message.
#[derive(Debug, Serialize)]
struct RpcNotification<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
}

/// JSON-RPC response message.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            }),
            (None, Some(value)) => Ok(serde_json::from_value(value)?),
            (None, None) => Err(RpcError::EmptyResponse),
        }
    }
}

// ============================================================================
// Pending Calls
// ============================================================================

#[derive(Debug, Default)]
struct Pending {
    waiters: HashMap<u64, oneshot::Sender<RpcResponse>>,
    closed: bool,
}

type SharedPending = Arc<Mutex<Pending>>;

fn lock(pending: &SharedPending) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the channel closed and fails every waiter.
fn fail_all(pending: &SharedPending) {
    let mut state = lock(pending);
    state.closed = true;
    // Dropping the senders wakes each caller with a receive error.
    state.waiters.clear();
}

/// Removes a waiter when its call future completes or is dropped.
struct WaiterGuard<'a> {
    pending: &'a SharedPending,
    id: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).waiters.remove(&self.id);
    }
}

enum WriterCommand {
    Line(String),
    Close,
}

// ============================================================================
// RPC Channel
// ============================================================================

/// JSON-RPC channel safe for concurrent callers.
pub struct RpcChannel {
    label: String,
    writer_tx: mpsc::Sender<WriterCommand>,
    pending: SharedPending,
    next_id: AtomicU64,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl RpcChannel {
    /// Starts the reader and writer tasks over a stream pair.
    ///
    /// `label` identifies the peer in log output.
    pub fn new<R, W>(label: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let label = label.into();
        let pending = SharedPending::default();
        let (writer_tx, writer_rx) = mpsc::channel(WRITER_QUEUE);

        let writer_task = tokio::spawn(writer_loop(
            label.clone(),
            writer,
            writer_rx,
            Arc::clone(&pending),
        ));
        let reader_task = tokio::spawn(reader_loop(label.clone(), reader, Arc::clone(&pending)));

        Self {
            label,
            writer_tx,
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
            writer_task,
        }
    }

    /// Returns true once the peer closed the stream or [`close`](Self::close) ran.
    pub fn is_closed(&self) -> bool {
        lock(&self.pending).closed
    }

    /// Sends a request and waits up to `timeout` for its response.
    pub async fn call<P, T>(&self, method: &str, params: P, timeout: Duration) -> Result<T, RpcError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        })?;

        let (tx, rx) = oneshot::channel();
        {
            let mut state = lock(&self.pending);
            if state.closed {
                return Err(RpcError::ConnectionClosed);
            }
            state.waiters.insert(id, tx);
        }
        let _guard = WaiterGuard {
            pending: &self.pending,
            id,
        };

        trace!(peer = %self.label, id, method, "Sending request");
        // One deadline covers queueing the request and waiting for the reply,
        // so a peer that stops reading cannot stall the caller.
        let exchange = async {
            self.writer_tx
                .send(WriterCommand::Line(line))
                .await
                .map_err(|_| RpcError::ConnectionClosed)?;
            rx.await.map_err(|_| RpcError::ConnectionClosed)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!(peer = %self.label, id, method, ?timeout, "Request timed out");
                Err(RpcError::Timeout(timeout))
            }
        }
    }

    /// Sends a notification. No response is expected.
    ///
    /// Fails with [`RpcError::Timeout`] when the message cannot be queued
    /// within `timeout`.
    pub async fn notify<P: Serialize>(
        &self,
        method: &str,
        params: P,
        timeout: Duration,
    ) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::ConnectionClosed);
        }

        let line = serde_json::to_string(&RpcNotification {
            jsonrpc: "2.0",
            method,
            params,
        })?;

        self.writer_tx
            .send_timeout(WriterCommand::Line(line), timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => RpcError::Timeout(timeout),
                SendTimeoutError::Closed(_) => RpcError::ConnectionClosed,
            })
    }

    /// Flushes queued messages, closes the write half and stops reading.
    ///
    /// Pending calls fail with [`RpcError::ConnectionClosed`]. Never waits on
    /// the peer: when the outgoing queue is full the writer is aborted and
    /// queued messages are dropped. Safe to call more than once.
    pub fn close(&self) {
        // Queued behind any earlier messages, so those are written first.
        if let Err(e) = self.writer_tx.try_send(WriterCommand::Close) {
            if matches!(e, TrySendError::Full(_)) {
                debug!(peer = %self.label, "Outgoing queue full, dropping unsent messages");
            }
            self.writer_task.abort();
        }
        fail_all(&self.pending);
        self.reader_task.abort();
        debug!(peer = %self.label, "Channel closed");
    }
}

impl Drop for RpcChannel {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

impl std::fmt::Debug for RpcChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChannel")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Background Tasks
// ============================================================================

async fn writer_loop<W>(
    label: String,
    mut writer: W,
    mut rx: mpsc::Receiver<WriterCommand>,
    pending: SharedPending,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(command) = rx.recv().await {
        let line = match command {
            WriterCommand::Line(line) => line,
            WriterCommand::Close => break,
        };

        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(peer = %label, error = %e, "Write failed");
            fail_all(&pending);
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        trace!(peer = %label, error = %e, "Shutdown of write half failed");
    }
}

async fn reader_loop<R>(label: String, reader: R, pending: SharedPending)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                route_response(&label, line, &pending);
            }
            Ok(None) => {
                debug!(peer = %label, "Peer closed the connection");
                break;
            }
            Err(e) => {
                warn!(peer = %label, error = %e, "Read failed");
                break;
            }
        }
    }

    fail_all(&pending);
}

fn route_response(label: &str, line: &str, pending: &SharedPending) {
    let response = match serde_json::from_str::<RpcResponse>(line) {
        Ok(response) => response,
        Err(e) => {
            // Notifications and log noise are not responses.
            trace!(peer = %label, error = %e, "Ignoring non-response line");
            return;
        }
    };

    let Some(id) = response.id else {
        trace!(peer = %label, "Ignoring message without id");
        return;
    };

    let waiter = lock(pending).waiters.remove(&id);
    match waiter {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => trace!(peer = %label, id, "Discarding late response"),
    }
}

// ============================================================================
// Tests
// ============================================================================
