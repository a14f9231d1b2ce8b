//! Logtail Configuration
//!
//! TOML configuration with defaults for every field. An empty file runs a
//! syslog UDP listener on port 3219.
//!
//! # Parsing
//!
//! ```
//! use logtail_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[input.syslog]\nport = 5514").unwrap();
//! assert_eq!(config.input.syslog.port, 5514);
//! ```
//!
//! # Example
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [input]
//! type = "syslog"
//!
//! [input.syslog]
//! address = "127.0.0.1"
//! queue_size = 64
//! ```
//!
//! See `configs/config.toml` for every option.

mod error;
mod input;
mod logging;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use input::{
    InputConfig, InputType, StartupMode, StdinInputConfig, SyslogFormat, SyslogInputConfig,
    SyslogProtocol, DEFAULT_SYSLOG_PORT, MAX_UDP_PAYLOAD,
};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Collector diagnostics
    pub log: LogConfig,

    /// Which tailer to run
    pub input: InputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges serde cannot express
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.input.kind, InputType::Syslog);
        assert_eq!(config.input.syslog.port, DEFAULT_SYSLOG_PORT);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"
output = "stderr"

[input]
type = "syslog"

[input.syslog]
address = "127.0.0.1"
port = 5514
protocol = "udp"
format = "rfc3164"
queue_size = 64
max_message_size = 4096
recv_buffer_size = 1048576
shutdown_timeout = "2s"
startup = "best_effort"

[input.stdin]
queue_size = 8
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.output, LogOutput::Stderr);

        let syslog = &config.input.syslog;
        assert_eq!(syslog.address, "127.0.0.1");
        assert_eq!(syslog.port, 5514);
        assert_eq!(syslog.queue_size, 64);
        assert_eq!(syslog.max_message_size, 4096);
        assert_eq!(syslog.recv_buffer_size, 1048576);
        assert_eq!(syslog.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(syslog.startup, StartupMode::BestEffort);
        assert_eq!(config.input.stdin.queue_size, 8);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("invalid { toml").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_runs_on_parse() {
        let err = Config::from_str("[input.syslog]\nqueue_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "queue_size", .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[input]\ntype = \"stdin\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.input.kind, InputType::Stdin);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_shipped_example_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/config.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.input.syslog.port, DEFAULT_SYSLOG_PORT);
    }
}
