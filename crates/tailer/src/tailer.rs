//! The tailer contract
//!
//! A tailer exposes a line stream, an error stream, and a close operation,
//! whatever the transport underneath.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TailerError;
use crate::line::{IngestionError, Line};

/// One item read from either of a tailer's channels
#[derive(Debug)]
pub enum TailerEvent {
    Line(Line),
    Error(IngestionError),
}

/// Lifecycle state of a tailer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailerState {
    /// Transport is up and delivering
    Booted,
    /// Transport failed to start; channels exist but stay silent
    Degraded,
    /// Terminal
    Closed,
}

/// What to do when the transport cannot be started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Return the failure from the start operation
    #[default]
    FailFast,
    /// Return a degraded tailer that reports the failure once on its error channel
    BestEffort,
}

/// Uniform pull interface over every transport
///
/// Lines and errors are each delivered in the order the transport produced
/// them. There is no ordering guarantee between the two channels.
#[async_trait]
pub trait Tailer: Send {
    /// Both receivers at once, so a consumer can wait on either
    fn channels(&mut self) -> (&mut mpsc::Receiver<Line>, &mut mpsc::Receiver<IngestionError>);

    /// Current lifecycle state
    fn state(&self) -> TailerState;

    /// Line stream
    fn lines(&mut self) -> &mut mpsc::Receiver<Line> {
        self.channels().0
    }

    /// Error stream; an error here never ends ingestion
    fn errors(&mut self) -> &mut mpsc::Receiver<IngestionError> {
        self.channels().1
    }

    /// Wait for the next line or error
    ///
    /// Returns `None` once both channels are closed and drained.
    async fn next_event(&mut self) -> Option<TailerEvent> {
        let (lines, errors) = self.channels();
        tokio::select! {
            Some(line) = lines.recv() => Some(TailerEvent::Line(line)),
            Some(error) = errors.recv() => Some(TailerEvent::Error(error)),
            else => None,
        }
    }

    /// Stop the transport, then release the channels
    ///
    /// Safe to call more than once; later calls return `Ok(())` without
    /// touching the transport. Items already queued stay readable.
    async fn close(&mut self) -> Result<(), TailerError>;
}
