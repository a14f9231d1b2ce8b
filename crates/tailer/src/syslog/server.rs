//! Syslog UDP Server
//!
//! Binds a UDP socket, decodes each datagram, and hands the result to a
//! registered [`Handler`] on the server's own task.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──listen_udp()──▶ bound ──boot()──▶ running ──kill()──▶ stopped
//! ```
//!
//! - `listen_udp` only binds; nothing is read until `boot`
//! - `boot` spawns the receive task on the current Tokio runtime
//! - `kill` cancels the task and waits for it (bounded by the shutdown timeout);
//!   once it returns the handler is never invoked again
//!
//! # Delivery
//!
//! The handler is awaited inline: the next datagram is not read until the
//! current one has been handled. A handler that waits (for example on a full
//! channel) therefore stalls the receive loop, and the kernel drops datagrams
//! that overflow the socket buffer meanwhile.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::format::{Format, LogParts, ParseError};

// =============================================================================
// Constants
// =============================================================================

/// Default maximum syslog message size (8KB)
const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;

/// Default socket receive buffer (256KB absorbs bursts while the handler waits)
const DEFAULT_RECV_BUFFER_SIZE: usize = 256 * 1024;

/// Default time `kill` waits for the receive task
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest UDP payload over IPv4
const MAX_UDP_PAYLOAD: usize = 65507;

/// First pause after a failed `recv_from`; doubles per consecutive failure
const RECV_BACKOFF_BASE: Duration = Duration::from_millis(1);

/// Longest pause between retries of a failing socket
const RECV_BACKOFF_MAX: Duration = Duration::from_millis(500);

// =============================================================================
// Configuration
// =============================================================================

/// Syslog server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Datagrams longer than this are reported as decode errors
    pub max_message_size: usize,

    /// Requested SO_RCVBUF (best effort)
    pub recv_buffer_size: usize,

    /// How long `kill` waits for the receive task
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Callback invoked once per received datagram
///
/// Runs on the server's receive task, never on the caller's. The next
/// datagram is not decoded until the returned future completes.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle one record
    ///
    /// `record` is the decoded field map, or the decode-level error.
    async fn handle(&self, record: Result<LogParts, ParseError>, received_at: DateTime<Utc>);
}

// =============================================================================
// Metrics
// =============================================================================

/// Syslog server metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Datagrams read from the socket
    pub datagrams_received: AtomicU64,

    /// Payload bytes read from the socket
    pub bytes_received: AtomicU64,

    /// Datagrams that failed to decode
    pub decode_errors: AtomicU64,

    /// Socket receive errors
    pub receive_errors: AtomicU64,

    /// Records whose handler was still pending when the server was killed
    pub records_abandoned: AtomicU64,
}

impl ServerMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
            records_abandoned: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn datagram_received(&self, bytes: u64) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_abandoned(&self) {
        self.records_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            records_abandoned: self.records_abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of server counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerMetricsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub decode_errors: u64,
    pub receive_errors: u64,
    pub records_abandoned: u64,
}

// =============================================================================
// Errors
// =============================================================================

/// Syslog server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Address string is not a socket address
    #[error("invalid listen address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Configured message limit cannot be expressed over UDP
    #[error("max message size {size} is outside 1..={MAX_UDP_PAYLOAD}")]
    InvalidMessageSize { size: usize },

    /// `listen_udp` called twice
    #[error("server is already listening")]
    AlreadyListening,

    /// `boot` called before `listen_udp`
    #[error("server is not listening")]
    NotListening,

    /// `boot` called without a handler
    #[error("no handler registered")]
    NoHandler,

    /// `boot` called twice
    #[error("server is already booted")]
    AlreadyBooted,

    /// `boot` called outside a Tokio runtime
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Socket could not be registered with the runtime
    #[error("failed to register socket: {0}")]
    Register(#[source] std::io::Error),

    /// `kill` called on a server that is not running
    #[error("server is not running")]
    NotRunning,

    /// Receive task did not stop in time and was aborted
    #[error("receive task did not stop within {timeout:?}")]
    StopTimeout { timeout: Duration },

    /// Receive task panicked
    #[error("receive task failed: {0}")]
    TaskFailed(#[source] tokio::task::JoinError),
}

// =============================================================================
// Server
// =============================================================================

/// Receive task handle, present while booted
struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Syslog server over UDP
pub struct SyslogServer {
    config: ServerConfig,
    format: Format,
    handler: Option<Arc<dyn Handler>>,
    /// Bound but not yet booted
    socket: Option<std::net::UdpSocket>,
    local_addr: Option<SocketAddr>,
    running: Option<Running>,
    metrics: Arc<ServerMetrics>,
}

impl SyslogServer {
    /// Create a server; nothing is bound yet
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            format: Format::default(),
            handler: None,
            socket: None,
            local_addr: None,
            running: None,
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    /// Select the wire format (takes effect at boot)
    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// Register the per-record handler (takes effect at boot)
    pub fn set_handler(&mut self, handler: Arc<dyn Handler>) {
        self.handler = Some(handler);
    }

    /// Bind a UDP socket on `address` ("host:port")
    ///
    /// Does not start reading. Port 0 picks an ephemeral port; see
    /// [`local_addr`](Self::local_addr).
    pub fn listen_udp(&mut self, address: &str) -> Result<(), ServerError> {
        if self.socket.is_some() || self.running.is_some() {
            return Err(ServerError::AlreadyListening);
        }
        if self.config.max_message_size == 0 || self.config.max_message_size > MAX_UDP_PAYLOAD {
            return Err(ServerError::InvalidMessageSize {
                size: self.config.max_message_size,
            });
        }

        let addr: SocketAddr = address.parse().map_err(|e| ServerError::InvalidAddress {
            address: address.to_string(),
            source: e,
        })?;
        let socket = self.bind_socket(addr).map_err(|e| ServerError::Bind {
            address: address.to_string(),
            source: e,
        })?;
        let local_addr = socket.local_addr().map_err(|e| ServerError::Bind {
            address: address.to_string(),
            source: e,
        })?;

        tracing::info!(address = %local_addr, "syslog UDP server listening");

        self.local_addr = Some(local_addr);
        self.socket = Some(socket);
        Ok(())
    }

    /// Start the receive task on the current Tokio runtime
    ///
    /// From here on the handler may run concurrently with the caller.
    pub fn boot(&mut self) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyBooted);
        }
        let handler = self.handler.clone().ok_or(ServerError::NoHandler)?;
        let runtime = tokio::runtime::Handle::try_current()?;
        let socket = self.socket.take().ok_or(ServerError::NotListening)?;

        let socket = {
            let _guard = runtime.enter();
            UdpSocket::from_std(socket).map_err(ServerError::Register)?
        };

        let cancel = CancellationToken::new();
        let receiver = Receiver {
            socket,
            format: self.format,
            handler,
            max_message_size: self.config.max_message_size,
            metrics: Arc::clone(&self.metrics),
            cancel: cancel.clone(),
        };
        let task = runtime.spawn(receiver.run());

        tracing::info!(
            address = ?self.local_addr,
            format = ?self.format,
            "syslog UDP server booted"
        );

        self.running = Some(Running { cancel, task });
        Ok(())
    }

    /// Stop the receive task and release the socket
    ///
    /// After this returns the handler is not invoked again. A bound but
    /// never-booted server just drops its socket. Returns
    /// [`ServerError::NotRunning`] if there is nothing to stop.
    pub async fn kill(&mut self) -> Result<(), ServerError> {
        let Some(Running { cancel, mut task }) = self.running.take() else {
            return match self.socket.take() {
                Some(_) => Ok(()),
                None => Err(ServerError::NotRunning),
            };
        };

        cancel.cancel();

        let timeout = self.config.shutdown_timeout;
        let waited = tokio::time::timeout(timeout, &mut task).await;
        let result = match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ServerError::TaskFailed(e)),
            Err(_) => {
                task.abort();
                // Wait for the abort to land so no handler call outlives kill()
                let _ = task.await;
                Err(ServerError::StopTimeout { timeout })
            }
        };

        tracing::info!(address = ?self.local_addr, "syslog UDP server stopped");
        result
    }

    /// Whether the receive task is running
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address actually bound, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    /// Create the socket with a larger receive buffer
    fn bind_socket(&self, addr: SocketAddr) -> std::io::Result<std::net::UdpSocket> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

        if let Err(e) = socket.set_recv_buffer_size(self.config.recv_buffer_size) {
            tracing::warn!(
                error = %e,
                requested_size = self.config.recv_buffer_size,
                "failed to set UDP SO_RCVBUF"
            );
        }

        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;
        Ok(socket.into())
    }
}

impl Drop for SyslogServer {
    fn drop(&mut self) {
        // Never leave a receive task running behind a dropped server
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for SyslogServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogServer")
            .field("config", &self.config)
            .field("format", &self.format)
            .field("local_addr", &self.local_addr)
            .field("running", &self.running.is_some())
            .finish()
    }
}

// =============================================================================
// Receive task
// =============================================================================

struct Receiver {
    socket: UdpSocket,
    format: Format,
    handler: Arc<dyn Handler>,
    max_message_size: usize,
    metrics: Arc<ServerMetrics>,
    cancel: CancellationToken,
}

impl Receiver {
    async fn run(self) {
        // One spare byte detects datagrams the kernel had to truncate
        let mut buf = vec![0u8; self.max_message_size + 1];
        let mut backoff = RecvBackoff::default();

        loop {
            let (len, peer) = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(received) => {
                        backoff.reset();
                        received
                    }
                    Err(e) => {
                        self.metrics.receive_error();
                        let pause = backoff.failed();
                        tracing::debug!(error = %e, retry_in = ?pause, "syslog UDP recv error");

                        tokio::select! {
                            biased;
                            _ = self.cancel.cancelled() => break,
                            _ = tokio::time::sleep(pause) => continue,
                        }
                    }
                },
            };

            let received_at = Utc::now();
            self.metrics.datagram_received(len as u64);

            let record = if len > self.max_message_size {
                Err(ParseError::TooLarge {
                    size: len,
                    limit: self.max_message_size,
                })
            } else {
                self.format.parse(&buf[..len], received_at, Some(peer))
            };
            if record.is_err() {
                self.metrics.decode_error();
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.metrics.record_abandoned();
                    break;
                }

                _ = self.handler.handle(record, received_at) => {}
            }
        }

        tracing::debug!("syslog UDP receive loop stopped");
    }
}

/// Pause schedule for a socket that keeps failing
#[derive(Debug, Default)]
struct RecvBackoff {
    consecutive: u32,
}

impl RecvBackoff {
    /// Record a failure and return how long to wait before retrying
    fn failed(&mut self) -> Duration {
        let exponent = self.consecutive.min(16);
        self.consecutive = self.consecutive.saturating_add(1);
        RECV_BACKOFF_BASE
            .saturating_mul(1 << exponent)
            .min(RECV_BACKOFF_MAX)
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
