//! Reader Tailer
//!
//! Newline-delimited text from stdin, or any async buffered reader, behind
//! the same [`Tailer`] contract as the network transports.
//!
//! - each line (LF or CRLF stripped) → [`Line`]
//! - a line that is not UTF-8, or longer than `max_line_size` →
//!   [`IngestionError`] of kind [`ErrorKind::ContentMissing`]; reading goes on
//! - an I/O error → one [`IngestionError`] of kind [`ErrorKind::Read`], then
//!   the stream ends
//! - end of input closes both channels
//!
//! Blocking inputs such as stdin are read on a dedicated thread, never on the
//! runtime's blocking pool, so an idle terminal or pipe cannot hold up runtime
//! shutdown.

use std::io::{self, Read};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, DuplexStream, ReadBuf,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TailerError;
use crate::line::{ErrorKind, IngestionError, Line, RecordError};
use crate::metrics::TailerMetrics;
use crate::outlet::{self, Outlet};
use crate::syslog::ParseError;
use crate::tailer::{Tailer, TailerState};

/// Default longest accepted line, terminator excluded
const DEFAULT_MAX_LINE_SIZE: usize = 64 * 1024;

/// Bytes buffered between the input thread and the reader task
const PIPE_CAPACITY: usize = 64 * 1024;

/// Reader tailer configuration
#[derive(Debug, Clone)]
pub struct ReaderTailerConfig {
    /// Capacity of each outbound channel
    pub queue_size: usize,

    /// How long `close` waits for the reader task
    pub shutdown_timeout: Duration,

    /// Lines longer than this are reported as errors, not delivered
    pub max_line_size: usize,

    /// Attached to every line, and used as error context
    pub source: Option<PathBuf>,
}

impl Default for ReaderTailerConfig {
    fn default() -> Self {
        Self {
            queue_size: 1,
            shutdown_timeout: Duration::from_secs(5),
            max_line_size: DEFAULT_MAX_LINE_SIZE,
            source: None,
        }
    }
}

/// Lines from an async reader as a [`Tailer`]
pub struct ReaderTailer {
    lines: mpsc::Receiver<Line>,
    errors: mpsc::Receiver<IngestionError>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
    state: TailerState,
    metrics: Arc<TailerMetrics>,
}

impl ReaderTailer {
    /// Tail the process's standard input
    pub fn stdin(config: ReaderTailerConfig) -> Result<Self, TailerError> {
        Self::from_blocking(io::stdin(), config)
    }

    /// Tail a blocking reader, read on its own thread
    ///
    /// The thread is detached. If it is parked in `read` when the tailer
    /// closes, it exits on its next read or at process exit.
    pub fn from_blocking<R>(input: R, config: ReaderTailerConfig) -> Result<Self, TailerError>
    where
        R: Read + Send + 'static,
    {
        let runtime = Handle::try_current()?;
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (failure_tx, failure_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("logtail-input".into())
            .spawn(move || forward_blocking(input, runtime, writer, failure_tx))
            .map_err(TailerError::Spawn)?;

        let pipe = InputPipe {
            reader,
            failure: failure_rx,
        };
        Self::spawn(BufReader::new(pipe), config)
    }

    /// Tail any buffered reader on the current Tokio runtime
    pub fn spawn<R>(reader: R, config: ReaderTailerConfig) -> Result<Self, TailerError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let runtime = Handle::try_current()?;
        let (outlet, inlet) = outlet::channel(config.queue_size);
        let metrics = outlet.metrics();
        let cancel = CancellationToken::new();

        let task = runtime.spawn(pump(
            reader,
            outlet,
            config.source.clone(),
            config.max_line_size,
            cancel.clone(),
        ));

        tracing::info!(source = ?config.source, "reader tailer started");

        Ok(Self {
            lines: inlet.lines,
            errors: inlet.errors,
            cancel,
            task: Some(task),
            shutdown_timeout: config.shutdown_timeout,
            state: TailerState::Booted,
            metrics,
        })
    }

    /// Delivery counters
    pub fn metrics(&self) -> &Arc<TailerMetrics> {
        &self.metrics
    }
}

// =============================================================================
// Blocking input
// =============================================================================

/// Copy a blocking reader into the pipe until EOF, error, or the pipe closes
///
/// A read error is parked in `failure` before the pipe is closed, so the
/// reading side sees it in place of EOF.
fn forward_blocking<R: Read>(
    mut input: R,
    runtime: Handle,
    mut writer: DuplexStream,
    failure: oneshot::Sender<io::Error>,
) {
    let mut buf = vec![0u8; 8192];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = failure.send(e);
                break;
            }
        };
        // Reader task gone
        if runtime.block_on(writer.write_all(&buf[..n])).is_err() {
            break;
        }
    }
}

/// Reading half of the pipe; surfaces the input thread's error at EOF
struct InputPipe {
    reader: DuplexStream,
    failure: oneshot::Receiver<io::Error>,
}

impl AsyncRead for InputPipe {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        ready!(Pin::new(&mut self.reader).poll_read(cx, buf))?;

        if buf.filled().len() == before {
            if let Ok(e) = self.failure.try_recv() {
                return Poll::Ready(Err(e));
            }
        }
        Poll::Ready(Ok(()))
    }
}

// =============================================================================
// Reader task
// =============================================================================

/// Read one LF-terminated line into `buf`, keeping at most `limit + 2` bytes
///
/// Returns the number of bytes consumed from `reader`, terminator included;
/// zero means EOF. Bytes past the kept prefix are skipped, not buffered.
async fn read_line_bounded<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let keep = limit.saturating_add(2);
    let mut consumed = 0;

    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(consumed);
            }
            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..=i], true),
                None => (available, false),
            };
            let room = keep.saturating_sub(buf.len()).min(chunk.len());
            buf.extend_from_slice(&chunk[..room]);
            (chunk.len(), done)
        };

        reader.consume(used);
        consumed += used;
        if done {
            return Ok(consumed);
        }
    }
}

/// Turn one raw line into text, or the reason it has none
fn decode_line(raw: &[u8], consumed: usize, limit: usize) -> Result<String, RecordError> {
    // Part of the line was skipped
    if consumed > raw.len() {
        return Err(ParseError::TooLarge {
            size: consumed,
            limit,
        }
        .into());
    }

    let content = raw.strip_suffix(b"\n").unwrap_or(raw);
    let content = content.strip_suffix(b"\r").unwrap_or(content);
    if content.len() > limit {
        return Err(ParseError::TooLarge {
            size: content.len(),
            limit,
        }
        .into());
    }

    String::from_utf8(content.to_vec()).map_err(|_| ParseError::InvalidUtf8.into())
}

/// Copy lines from `reader` into the outlet until EOF, I/O error, or cancel
async fn pump<R>(
    mut reader: R,
    outlet: Outlet,
    source: Option<PathBuf>,
    max_line_size: usize,
    cancel: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let context = source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = read_line_bounded(&mut reader, &mut buf, max_line_size) => read,
        };

        let delivered = match read {
            Ok(0) => break,
            Ok(consumed) => {
                let send = async {
                    match decode_line(&buf, consumed, max_line_size) {
                        Ok(text) => {
                            let line = match &source {
                                Some(path) => Line::with_source(text, path.clone()),
                                None => Line::new(text),
                            };
                            outlet.send_line(line).await
                        }
                        Err(cause) => {
                            let error = IngestionError::new(
                                ErrorKind::ContentMissing,
                                cause,
                                context.clone(),
                            );
                            outlet.send_error(error).await
                        }
                    }
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    delivered = send => delivered,
                }
            }
            Err(e) => {
                let error = IngestionError::new(ErrorKind::Read, e, context.clone());
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = outlet.send_error(error) => {}
                }
                break;
            }
        };

        // Tailer handle dropped
        if !delivered {
            break;
        }
    }
}

#[async_trait]
impl Tailer for ReaderTailer {
    fn channels(&mut self) -> (&mut mpsc::Receiver<Line>, &mut mpsc::Receiver<IngestionError>) {
        (&mut self.lines, &mut self.errors)
    }

    fn state(&self) -> TailerState {
        self.state
    }

    async fn close(&mut self) -> Result<(), TailerError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        self.state = TailerState::Closed;
        self.cancel.cancel();

        let timeout = self.shutdown_timeout;
        let waited = tokio::time::timeout(timeout, &mut task).await;
        let result = match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TailerError::TaskFailed(e)),
            Err(_) => {
                task.abort();
                let _ = task.await;
                Err(TailerError::StopTimeout { timeout })
            }
        };

        match &result {
            Ok(()) => tracing::info!("reader tailer closed"),
            Err(e) => tracing::error!(error = %e, "reader tailer did not stop cleanly"),
        }
        result
    }
}

impl Drop for ReaderTailer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ReaderTailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderTailer")
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod reader_test;
