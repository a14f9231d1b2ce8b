//! Input builder - constructs the configured tailer
//!
//! Maps `[input]` onto the tailer crate's own config types. The config crate
//! knows nothing about tailers, so the conversion lives here.

use logtail_config::{
    InputConfig, InputType, StartupMode, StdinInputConfig, SyslogFormat, SyslogInputConfig,
    SyslogProtocol,
};
use logtail_tailer::{
    Format, ReaderTailer, ReaderTailerConfig, ServerConfig, StartupPolicy, SyslogUdpTailer,
    SyslogUdpTailerConfig, Tailer, TailerError,
};

/// Start the tailer selected by `input.type`
///
/// Must be called from within a Tokio runtime.
pub fn build(input: &InputConfig) -> Result<Box<dyn Tailer>, TailerError> {
    match input.kind {
        InputType::Syslog => match input.syslog.protocol {
            SyslogProtocol::Udp => {
                let tailer = SyslogUdpTailer::start(syslog_udp_config(&input.syslog))?;
                Ok(Box::new(tailer))
            }
        },
        InputType::Stdin => {
            let tailer = ReaderTailer::stdin(stdin_config(&input.stdin))?;
            Ok(Box::new(tailer))
        }
    }
}

pub fn syslog_udp_config(syslog: &SyslogInputConfig) -> SyslogUdpTailerConfig {
    SyslogUdpTailerConfig {
        address: syslog.address.clone(),
        port: syslog.port,
        format: match syslog.format {
            SyslogFormat::Rfc3164 => Format::Rfc3164,
        },
        queue_size: syslog.queue_size,
        server: ServerConfig {
            max_message_size: syslog.max_message_size,
            recv_buffer_size: syslog.recv_buffer_size,
            shutdown_timeout: syslog.shutdown_timeout,
        },
        startup: startup_policy(syslog.startup),
    }
}

pub fn stdin_config(stdin: &StdinInputConfig) -> ReaderTailerConfig {
    ReaderTailerConfig {
        queue_size: stdin.queue_size,
        shutdown_timeout: stdin.shutdown_timeout,
        max_line_size: stdin.max_line_size,
        source: stdin.label.clone(),
    }
}

fn startup_policy(mode: StartupMode) -> StartupPolicy {
    match mode {
        StartupMode::FailFast => StartupPolicy::FailFast,
        StartupMode::BestEffort => StartupPolicy::BestEffort,
    }
}
