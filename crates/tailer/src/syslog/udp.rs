//! Syslog UDP Tailer
//!
//! Bridges the callback-driven [`SyslogServer`] into the two-channel
//! [`Tailer`] contract.
//!
//! # Translation
//!
//! For every record the server hands over:
//!
//! - decode error, or no text `content` field → [`IngestionError`] of kind
//!   [`ErrorKind::ContentMissing`] on the error channel
//! - otherwise → [`Line`] carrying the content verbatim on the line channel
//!
//! Sends are awaited on the server's receive task. A consumer that stops
//! reading stalls the socket reader; UDP has no flow control, so the kernel
//! drops what no longer fits in the socket buffer.
//!
//! # Example
//!
//! ```ignore
//! let config = SyslogUdpTailerConfig {
//!     address: "127.0.0.1".into(),
//!     port: 3219,
//!     ..Default::default()
//! };
//!
//! let mut tailer = SyslogUdpTailer::start(config)?;
//! while let Some(line) = tailer.lines().recv().await {
//!     println!("{}", line);
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::TailerError;
use crate::line::{ErrorKind, IngestionError, Line, RecordError};
use crate::metrics::TailerMetrics;
use crate::outlet::{self, Inlet, Outlet};
use crate::tailer::{StartupPolicy, Tailer, TailerState};

use super::format::{keys, Format, LogParts, ParseError, PartValue};
use super::server::{Handler, ServerConfig, ServerMetrics, SyslogServer};

const TRANSPORT: &str = "syslog UDP";

// =============================================================================
// Constants
// =============================================================================

/// Default listen port
const DEFAULT_PORT: u16 = 3219;

/// Default channel capacity; one queued item before the transport waits
const DEFAULT_QUEUE_SIZE: usize = 1;

// =============================================================================
// Configuration
// =============================================================================

/// Syslog UDP tailer configuration
#[derive(Debug, Clone)]
pub struct SyslogUdpTailerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port (0 picks an ephemeral port)
    pub port: u16,

    /// Wire format
    pub format: Format,

    /// Capacity of each outbound channel
    pub queue_size: usize,

    /// Server settings (message limit, socket buffer, shutdown timeout)
    pub server: ServerConfig,

    /// What to do if the socket cannot be bound or the server cannot boot
    pub startup: StartupPolicy,
}

impl Default for SyslogUdpTailerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            format: Format::Rfc3164,
            queue_size: DEFAULT_QUEUE_SIZE,
            server: ServerConfig::default(),
            startup: StartupPolicy::FailFast,
        }
    }
}

impl SyslogUdpTailerConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    ///
    /// IPv6 literals are bracketed.
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    /// Shutdown timeout the tailer will honor in `close`
    pub fn shutdown_timeout(&self) -> Duration {
        self.server.shutdown_timeout
    }
}

// =============================================================================
// Translation
// =============================================================================

/// Turn one decoded record into a line, or the reason it has none
pub(crate) fn translate(record: Result<LogParts, ParseError>) -> Result<Line, RecordError> {
    let mut parts = record?;
    match parts.remove(keys::CONTENT) {
        Some(PartValue::Text(content)) => Ok(Line::new(content)),
        Some(other) => Err(RecordError::ContentNotText {
            found: other.type_name(),
        }),
        None => Err(RecordError::NoContent),
    }
}

/// The server's handler: translates and publishes each record
pub(crate) struct RecordTranslator {
    outlet: Outlet,
}

impl RecordTranslator {
    pub(crate) fn new(outlet: Outlet) -> Self {
        Self { outlet }
    }
}

#[async_trait]
impl Handler for RecordTranslator {
    async fn handle(&self, record: Result<LogParts, ParseError>, _received_at: DateTime<Utc>) {
        match translate(record) {
            Ok(line) => {
                self.outlet.send_line(line).await;
            }
            Err(cause) => {
                let error = IngestionError::new(ErrorKind::ContentMissing, cause, "");
                self.outlet.send_error(error).await;
            }
        }
    }
}

// =============================================================================
// Tailer
// =============================================================================

/// Syslog over UDP as a [`Tailer`]
///
/// Owns the server; the server owns the handler, and the handler owns the
/// sending half of both channels. Dropping the server after it has stopped
/// is what closes the channels.
pub struct SyslogUdpTailer {
    lines: mpsc::Receiver<Line>,
    errors: mpsc::Receiver<IngestionError>,
    server: Option<SyslogServer>,
    state: TailerState,
    metrics: Arc<TailerMetrics>,
    server_metrics: Arc<ServerMetrics>,
    local_addr: Option<SocketAddr>,
}

impl SyslogUdpTailer {
    /// Bind, boot, and return the running tailer
    ///
    /// Must be called from within a Tokio runtime. On failure the configured
    /// [`StartupPolicy`] decides between returning [`TailerError::Startup`] and
    /// returning a degraded tailer that reports the failure on its error channel.
    pub fn start(config: SyslogUdpTailerConfig) -> Result<Self, TailerError> {
        let (outlet, inlet) = outlet::channel(config.queue_size);

        let mut server = SyslogServer::new(config.server.clone());
        server.set_format(config.format);
        server.set_handler(Arc::new(RecordTranslator::new(outlet.clone())));

        Self::launch(server, config.bind_address(), config.startup, outlet, inlet)
    }

    /// Bind and boot a server whose handler already holds `outlet`
    pub(crate) fn launch(
        mut server: SyslogServer,
        address: String,
        startup: StartupPolicy,
        outlet: Outlet,
        inlet: Inlet,
    ) -> Result<Self, TailerError> {
        let metrics = outlet.metrics();
        let server_metrics = Arc::clone(server.metrics());

        let started = server.listen_udp(&address).and_then(|()| server.boot());

        let state = match started {
            Ok(()) => {
                tracing::info!(address = %address, "syslog UDP tailer started");
                TailerState::Booted
            }
            Err(e) => {
                tracing::error!(address = %address, error = %e, "failed to start syslog UDP tailer");
                match startup {
                    StartupPolicy::FailFast => {
                        return Err(TailerError::Startup {
                            transport: TRANSPORT,
                            address,
                            source: e,
                        });
                    }
                    StartupPolicy::BestEffort => {
                        // Channel is empty, so this always fits
                        outlet.try_send_error(IngestionError::new(
                            ErrorKind::Startup,
                            RecordError::Startup(e),
                            address,
                        ));
                        TailerState::Degraded
                    }
                }
            }
        };

        let local_addr = server.local_addr();
        Ok(Self {
            lines: inlet.lines,
            errors: inlet.errors,
            server: Some(server),
            state,
            metrics,
            server_metrics,
            local_addr,
        })
    }

    /// Address actually bound, if binding succeeded
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Delivery counters
    pub fn metrics(&self) -> &Arc<TailerMetrics> {
        &self.metrics
    }

    /// Socket and decode counters
    pub fn server_metrics(&self) -> &Arc<ServerMetrics> {
        &self.server_metrics
    }
}

#[async_trait]
impl Tailer for SyslogUdpTailer {
    fn channels(&mut self) -> (&mut mpsc::Receiver<Line>, &mut mpsc::Receiver<IngestionError>) {
        (&mut self.lines, &mut self.errors)
    }

    fn state(&self) -> TailerState {
        self.state
    }

    async fn close(&mut self) -> Result<(), TailerError> {
        let Some(mut server) = self.server.take() else {
            return Ok(());
        };
        let was_booted = self.state == TailerState::Booted;
        self.state = TailerState::Closed;

        let stopped = if was_booted {
            server.kill().await
        } else {
            Ok(())
        };
        // Server is stopped; dropping it drops the handler and closes both channels
        drop(server);

        match stopped {
            Ok(()) => {
                tracing::info!(address = ?self.local_addr, "syslog UDP tailer closed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to stop syslog server");
                Err(TailerError::Shutdown {
                    transport: TRANSPORT,
                    source: e,
                })
            }
        }
    }
}

impl std::fmt::Debug for SyslogUdpTailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogUdpTailer")
            .field("state", &self.state)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
