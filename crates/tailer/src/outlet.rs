//! Producer half of a tailer's two outbound channels
//!
//! Every transport publishes through an [`Outlet`]. Sends are awaited, so a
//! full channel suspends the producing task until the consumer catches up.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::line::{IngestionError, Line};
use crate::metrics::TailerMetrics;

/// Sending side of the line and error channels
#[derive(Debug, Clone)]
pub(crate) struct Outlet {
    lines: mpsc::Sender<Line>,
    errors: mpsc::Sender<IngestionError>,
    metrics: Arc<TailerMetrics>,
}

/// Receiving side handed to the tailer handle
pub(crate) struct Inlet {
    pub lines: mpsc::Receiver<Line>,
    pub errors: mpsc::Receiver<IngestionError>,
}

/// Create the channel pair
///
/// A capacity of zero is raised to one; tokio channels cannot rendezvous.
pub(crate) fn channel(capacity: usize) -> (Outlet, Inlet) {
    let capacity = capacity.max(1);
    let (lines_tx, lines_rx) = mpsc::channel(capacity);
    let (errors_tx, errors_rx) = mpsc::channel(capacity);

    let outlet = Outlet {
        lines: lines_tx,
        errors: errors_tx,
        metrics: Arc::new(TailerMetrics::new()),
    };
    let inlet = Inlet {
        lines: lines_rx,
        errors: errors_rx,
    };
    (outlet, inlet)
}

impl Outlet {
    /// Offer a line, waiting for capacity
    ///
    /// Returns `false` once the tailer handle is gone.
    pub async fn send_line(&self, line: Line) -> bool {
        match self.lines.send(line).await {
            Ok(()) => {
                self.metrics.line_sent();
                true
            }
            Err(_) => {
                self.metrics.undeliverable();
                false
            }
        }
    }

    /// Offer an error, waiting for capacity
    pub async fn send_error(&self, error: IngestionError) -> bool {
        match self.errors.send(error).await {
            Ok(()) => {
                self.metrics.error_sent();
                true
            }
            Err(_) => {
                self.metrics.undeliverable();
                false
            }
        }
    }

    /// Queue an error without waiting
    ///
    /// Used before any consumer exists, when the channel is known to be empty.
    pub fn try_send_error(&self, error: IngestionError) -> bool {
        match self.errors.try_send(error) {
            Ok(()) => {
                self.metrics.error_sent();
                true
            }
            Err(_) => {
                self.metrics.undeliverable();
                false
            }
        }
    }

    pub fn metrics(&self) -> Arc<TailerMetrics> {
        Arc::clone(&self.metrics)
    }
}
