//! Syslog Transport
//!
//! RFC 3164 syslog over UDP.
//!
//! # Layers
//!
//! - [`SyslogServer`] - binds the socket, decodes datagrams, invokes a [`Handler`]
//!   once per record on its own task
//! - [`SyslogUdpTailer`] - the handler: translates records into lines or errors
//!   and exposes them through the [`Tailer`](crate::Tailer) contract
//!
//! The server knows nothing about lines; the tailer never touches the socket.

pub mod format;
pub mod server;
pub mod udp;

pub use format::{trim_trailing_newline, Format, LogParts, ParseError, PartValue};
pub use server::{Handler, ServerConfig, ServerError, ServerMetrics, ServerMetricsSnapshot, SyslogServer};
pub use udp::{SyslogUdpTailer, SyslogUdpTailerConfig};
