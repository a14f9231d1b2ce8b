//! Tailer lifecycle errors
//!
//! Per-record problems never show up here; they travel on the error channel
//! as [`IngestionError`](crate::IngestionError).

use std::time::Duration;

use crate::syslog::ServerError;

/// Errors from starting or closing a tailer
#[derive(Debug, thiserror::Error)]
pub enum TailerError {
    /// Transport failed to listen or boot
    #[error("{transport} tailer failed to start on {address}: {source}")]
    Startup {
        transport: &'static str,
        address: String,
        #[source]
        source: ServerError,
    },

    /// Transport did not stop cleanly (teardown still completed)
    #[error("{transport} tailer failed to stop cleanly: {source}")]
    Shutdown {
        transport: &'static str,
        #[source]
        source: ServerError,
    },

    /// Tailer was started outside a Tokio runtime
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Reader task ignored cancellation
    #[error("reader task did not stop within {timeout:?}")]
    StopTimeout { timeout: Duration },

    /// Reader task panicked
    #[error("reader task failed: {0}")]
    TaskFailed(#[source] tokio::task::JoinError),

    /// Thread feeding a blocking input could not be started
    #[error("failed to spawn input thread: {0}")]
    Spawn(#[source] std::io::Error),
}
