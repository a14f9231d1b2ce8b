//! Configuration validation
//!
//! Range checks serde cannot express. Only the selected input is checked.

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::input::{InputType, StdinInputConfig, SyslogInputConfig, MAX_UDP_PAYLOAD};
use crate::logging::LogConfig;

const SYSLOG: &str = "input.syslog";
const STDIN: &str = "input.stdin";

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_log(&config.log)?;
    match config.input.kind {
        InputType::Syslog => validate_syslog(&config.input.syslog),
        InputType::Stdin => validate_stdin(&config.input.stdin),
    }
}

fn validate_log(log: &LogConfig) -> Result<()> {
    if log.output.path().is_some_and(|p| p.as_os_str().is_empty()) {
        return Err(ConfigError::missing_field("log", "output"));
    }
    Ok(())
}

fn validate_syslog(syslog: &SyslogInputConfig) -> Result<()> {
    if syslog.address.trim().is_empty() {
        return Err(ConfigError::missing_field(SYSLOG, "address"));
    }
    check_queue_size(SYSLOG, syslog.queue_size)?;

    if syslog.max_message_size == 0 || syslog.max_message_size > MAX_UDP_PAYLOAD {
        return Err(ConfigError::invalid_value(
            SYSLOG,
            "max_message_size",
            format!(
                "{} is outside 1..={}",
                syslog.max_message_size, MAX_UDP_PAYLOAD
            ),
        ));
    }

    if syslog.recv_buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            SYSLOG,
            "recv_buffer_size",
            "must be at least 1",
        ));
    }

    check_shutdown_timeout(SYSLOG, syslog.shutdown_timeout)
}

fn validate_stdin(stdin: &StdinInputConfig) -> Result<()> {
    check_queue_size(STDIN, stdin.queue_size)?;
    if stdin.max_line_size == 0 {
        return Err(ConfigError::invalid_value(
            STDIN,
            "max_line_size",
            "must be at least 1",
        ));
    }
    check_shutdown_timeout(STDIN, stdin.shutdown_timeout)
}

fn check_queue_size(section: &'static str, queue_size: usize) -> Result<()> {
    if queue_size == 0 {
        return Err(ConfigError::invalid_value(
            section,
            "queue_size",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn check_shutdown_timeout(section: &'static str, timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            section,
            "shutdown_timeout",
            "must be greater than zero",
        ));
    }
    Ok(())
}
