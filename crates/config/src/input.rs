//! Input configuration
//!
//! Selects which tailer the collector runs and how it is tuned. Only the
//! section named by `type` is used; the other keeps its defaults.
//!
//! ```toml
//! [input]
//! type = "syslog"
//!
//! [input.syslog]
//! port = 5514
//! startup = "best_effort"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default syslog listen port
pub const DEFAULT_SYSLOG_PORT: u16 = 3219;

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// Which tailer to run
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Syslog datagrams from the network
    #[default]
    Syslog,
    /// Newline-delimited text on standard input
    Stdin,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syslog => "syslog",
            Self::Stdin => "stdin",
        }
    }
}

/// Syslog transport
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyslogProtocol {
    #[default]
    Udp,
}

/// Syslog wire format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyslogFormat {
    /// BSD syslog
    #[default]
    Rfc3164,
}

/// What to do when the listener cannot start
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    /// Refuse to start
    #[default]
    FailFast,
    /// Start anyway and report the failure on the error stream
    BestEffort,
}

/// `[input]` section
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    /// Default: syslog
    #[serde(rename = "type")]
    pub kind: InputType,

    pub syslog: SyslogInputConfig,

    pub stdin: StdinInputConfig,
}

/// `[input.syslog]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyslogInputConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 3219
    pub port: u16,

    /// Default: udp
    pub protocol: SyslogProtocol,

    /// Default: rfc3164
    pub format: SyslogFormat,

    /// Capacity of the line and error channels
    /// Default: 1
    pub queue_size: usize,

    /// Datagrams larger than this are reported as errors
    /// Default: 8192
    pub max_message_size: usize,

    /// SO_RCVBUF for the socket (bytes)
    /// Default: 262144
    pub recv_buffer_size: usize,

    /// How long close waits for the receive task
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Default: fail_fast
    pub startup: StartupMode,
}

impl Default for SyslogInputConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_SYSLOG_PORT,
            protocol: SyslogProtocol::Udp,
            format: SyslogFormat::Rfc3164,
            queue_size: 1,
            max_message_size: 8192,
            recv_buffer_size: 256 * 1024,
            shutdown_timeout: Duration::from_secs(5),
            startup: StartupMode::FailFast,
        }
    }
}

/// `[input.stdin]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StdinInputConfig {
    /// Default: 1
    pub queue_size: usize,

    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Longest accepted line in bytes; longer lines are reported as errors.
    /// Default: 65536
    pub max_line_size: usize,

    /// Attached to every line as its source
    pub label: Option<PathBuf>,
}

impl Default for StdinInputConfig {
    fn default() -> Self {
        Self {
            queue_size: 1,
            shutdown_timeout: Duration::from_secs(5),
            max_line_size: 64 * 1024,
            label: None,
        }
    }
}
