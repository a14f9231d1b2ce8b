//! logtail - tail syslog or stdin and print each line
//!
//! # Usage
//!
//! ```bash
//! # Listen for syslog over UDP (configs/config.toml if present, else defaults)
//! logtail
//! logtail --config /etc/logtail.toml --log-level debug
//! ```
//!
//! Lines go to stdout, one per line. Ingestion errors and lifecycle events
//! go to the configured log output.

mod input_builder;
mod serve;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use logtail_config::{Config, LogConfig, LogFormat, LogLevel, LogOutput};

/// Config file tried when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "configs/config.toml";

/// logtail - syslog and stdin ingestion front end
#[derive(Parser, Debug)]
#[command(name = "logtail")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to configs/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(short, long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = load_config(cli.config)?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    init_logging(&config.log)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = config_path.as_deref().unwrap_or("(default)"),
        input = config.input.kind.as_str(),
        "logtail starting"
    );

    serve::run(config).await?;

    info!("logtail shutdown complete");
    Ok(())
}

/// Load config from an explicit path, the default path, or built-in defaults
fn load_config(path: Option<PathBuf>) -> Result<(Config, Option<String>)> {
    match path {
        // Explicit path must exist
        Some(path) => {
            let config = Config::from_file(&path).context("failed to load configuration")?;
            Ok((config, Some(path.display().to_string())))
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                let config =
                    Config::from_file(&default).context("failed to load configuration")?;
                Ok((config, Some(DEFAULT_CONFIG_PATH.to_string())))
            } else {
                Ok((Config::default(), None))
            }
        }
    }
}

/// Initialize the tracing subscriber from `[log]`
fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(log.level.as_str())
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let (writer, ansi) = match &log.output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file '{}'", path))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match log.format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
    };
    installed.context("failed to install log subscriber")
}
