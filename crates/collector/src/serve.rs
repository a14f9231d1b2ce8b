//! Serve - run the configured tailer until shutdown
//!
//! Lines are written to stdout as they arrive. Ingestion errors are logged
//! and never stop the loop. The loop ends on Ctrl+C, SIGTERM, or when the
//! tailer closes both streams (end of stdin).

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::signal;
use tracing::{error, info, warn};

use logtail_config::Config;
use logtail_tailer::{Tailer, TailerEvent};

use crate::input_builder;

/// Main run loop
pub async fn run(config: Config) -> Result<()> {
    let mut tailer = input_builder::build(&config.input).context("failed to start input")?;

    info!(
        input = config.input.kind.as_str(),
        state = ?tailer.state(),
        "tailer running"
    );

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    let mut stdout = tokio::io::stdout();
    let pumped = tokio::select! {
        pumped = pump(tailer.as_mut(), &mut stdout) => pumped,
        _ = &mut shutdown => {
            info!("shutdown signal received, closing tailer...");
            Ok(())
        }
    };

    // Always close, even if stdout went away
    let closed = tailer.close().await.context("failed to close tailer");
    pumped.context("failed to write to stdout")?;
    closed
}

/// Forward events until both streams end
///
/// Returns early only if `out` fails.
async fn pump<W>(tailer: &mut dyn Tailer, out: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut lines: u64 = 0;
    let mut errors: u64 = 0;

    while let Some(event) = tailer.next_event().await {
        match event {
            TailerEvent::Line(line) => {
                lines += 1;
                out.write_all(line.line().as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
            }
            TailerEvent::Error(err) => {
                errors += 1;
                warn!(kind = %err.kind(), error = %err, "ingestion error");
            }
        }
    }

    info!(lines, errors, "input exhausted");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
