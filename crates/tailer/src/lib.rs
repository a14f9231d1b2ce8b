//! logtail - Tailers
//!
//! Transports that turn external input into a pull-based stream of [`Line`]s
//! plus a parallel stream of [`IngestionError`]s.
//!
//! # Available Tailers
//!
//! - **Syslog UDP** - RFC 3164 syslog over UDP ([`SyslogUdpTailer`])
//! - **Reader** - newline-delimited text from stdin or any async reader ([`ReaderTailer`])
//!
//! # Design Principles
//!
//! - **One contract**: every transport implements [`Tailer`], so a single consumer
//!   loop handles all of them
//! - **Backpressure**: outbound channels are bounded; a slow consumer suspends the
//!   transport instead of growing a queue
//! - **Errors are data**: malformed input becomes an [`IngestionError`] on the error
//!   channel and ingestion continues
//! - **Clean shutdown**: [`Tailer::close`] stops the transport before the channels are
//!   released, so nothing is emitted after it returns
//!
//! # Example
//!
//! ```ignore
//! use logtail_tailer::{SyslogUdpTailer, SyslogUdpTailerConfig, Tailer, TailerEvent};
//!
//! let mut tailer = SyslogUdpTailer::start(SyslogUdpTailerConfig::with_port(3219))?;
//!
//! while let Some(event) = tailer.next_event().await {
//!     match event {
//!         TailerEvent::Line(line) => println!("{}", line),
//!         TailerEvent::Error(err) => eprintln!("{}", err),
//!     }
//! }
//!
//! tailer.close().await?;
//! ```

mod error;
mod line;
mod metrics;
mod outlet;
pub mod reader;
pub mod syslog;
mod tailer;

pub use error::TailerError;
pub use line::{ErrorKind, IngestionError, Line, RecordError};
pub use metrics::{TailerMetrics, TailerMetricsSnapshot};
pub use reader::{ReaderTailer, ReaderTailerConfig};
pub use syslog::{
    Format, Handler, LogParts, ParseError, PartValue, ServerConfig, ServerError, ServerMetrics,
    SyslogServer, SyslogUdpTailer, SyslogUdpTailerConfig,
};
pub use tailer::{StartupPolicy, Tailer, TailerEvent, TailerState};
