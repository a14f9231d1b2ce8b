//! Tests for the reader tailer

use std::path::Path;
use std::time::Duration;

use std::io::{self, Read};
use std::sync::mpsc as std_mpsc;

use tokio::io::{AsyncWriteExt, BufReader};

use crate::line::{ErrorKind, IngestionError, RecordError};
use crate::reader::{ReaderTailer, ReaderTailerConfig};
use crate::syslog::ParseError;
use crate::tailer::{Tailer, TailerEvent, TailerState};
use crate::TailerError;

const WAIT: Duration = Duration::from_secs(2);

async fn drain(tailer: &mut ReaderTailer) -> Vec<TailerEvent> {
    let mut events = Vec::new();
    while let Some(event) = tokio::time::timeout(WAIT, tailer.next_event()).await.unwrap() {
        events.push(event);
    }
    events
}

fn split(events: Vec<TailerEvent>) -> (Vec<String>, Vec<IngestionError>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for event in events {
        match event {
            TailerEvent::Line(line) => lines.push(line.into_line()),
            TailerEvent::Error(err) => errors.push(err),
        }
    }
    (lines, errors)
}

/// Blocking reader fed over a std channel; EOF once the sender drops
struct Blocking {
    chunks: std_mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

fn blocking_input() -> (std_mpsc::Sender<Vec<u8>>, Blocking) {
    let (tx, rx) = std_mpsc::channel();
    let input = Blocking {
        chunks: rx,
        pending: Vec::new(),
    };
    (tx, input)
}

impl Read for Blocking {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Yields its chunks, then fails
struct Failing {
    chunks: Vec<Vec<u8>>,
}

impl Read for Failing {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.chunks.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
        }
        let chunk = self.chunks.remove(0);
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

#[test]
fn test_config_defaults() {
    let config = ReaderTailerConfig::default();
    assert_eq!(config.queue_size, 1);
    assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    assert_eq!(config.max_line_size, 64 * 1024);
    assert!(config.source.is_none());
}

#[test]
fn test_spawn_outside_runtime() {
    let result = ReaderTailer::spawn(&b"line\n"[..], ReaderTailerConfig::default());
    assert!(matches!(result, Err(TailerError::NoRuntime(_))));
}

#[tokio::test]
async fn test_lines_until_eof() {
    let input: &[u8] = b"first\nsecond\r\n  third  \nlast without newline";
    let mut tailer = ReaderTailer::spawn(input, ReaderTailerConfig::default()).unwrap();

    let lines: Vec<String> = drain(&mut tailer)
        .await
        .into_iter()
        .map(|event| match event {
            TailerEvent::Line(line) => line.into_line(),
            TailerEvent::Error(err) => panic!("unexpected error: {}", err),
        })
        .collect();

    assert_eq!(lines, ["first", "second", "  third  ", "last without newline"]);
    assert_eq!(tailer.metrics().snapshot().lines_sent, 4);

    tailer.close().await.unwrap();
    assert_eq!(tailer.state(), TailerState::Closed);
}

#[tokio::test]
async fn test_source_attached() {
    let config = ReaderTailerConfig {
        source: Some("/var/log/app.log".into()),
        ..Default::default()
    };
    let mut tailer = ReaderTailer::spawn(&b"hello\n"[..], config).unwrap();

    let line = tokio::time::timeout(WAIT, tailer.lines().recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.line(), "hello");
    assert_eq!(line.source(), Some(Path::new("/var/log/app.log")));

    tailer.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_line_skipped() {
    let config = ReaderTailerConfig {
        source: Some("stdin".into()),
        queue_size: 4,
        ..Default::default()
    };
    let input: &[u8] = b"good\n\xff\xfe bad utf8\nafter bad\n";
    let mut tailer = ReaderTailer::spawn(input, config).unwrap();

    let (lines, errors) = split(drain(&mut tailer).await);
    assert_eq!(lines, ["good", "after bad"]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::ContentMissing);
    assert_eq!(errors[0].context(), "stdin");
    assert!(matches!(
        errors[0].cause(),
        RecordError::Decode(ParseError::InvalidUtf8)
    ));

    tailer.close().await.unwrap();
}

#[tokio::test]
async fn test_overlong_line_skipped() {
    let config = ReaderTailerConfig {
        max_line_size: 8,
        queue_size: 4,
        ..Default::default()
    };
    let input: &[u8] = b"short\nthis line is far too long\n12345678\r\n123456789\nnext\n";
    let mut tailer = ReaderTailer::spawn(input, config).unwrap();

    let (lines, errors) = split(drain(&mut tailer).await);
    assert_eq!(lines, ["short", "12345678", "next"]);
    assert_eq!(errors.len(), 2);
    for err in &errors {
        assert_eq!(err.kind(), ErrorKind::ContentMissing);
        assert!(matches!(
            err.cause(),
            RecordError::Decode(ParseError::TooLarge { limit: 8, .. })
        ));
    }

    tailer.close().await.unwrap();
}

#[tokio::test]
async fn test_overlong_final_line_without_newline() {
    let config = ReaderTailerConfig {
        max_line_size: 4,
        queue_size: 4,
        ..Default::default()
    };
    let input: &[u8] = b"ok\nno newline and too long";
    let mut tailer = ReaderTailer::spawn(input, config).unwrap();

    let (lines, errors) = split(drain(&mut tailer).await);
    assert_eq!(lines, ["ok"]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].cause(),
        RecordError::Decode(ParseError::TooLarge { size: 23, limit: 4 })
    ));

    tailer.close().await.unwrap();
}

#[tokio::test]
async fn test_io_error_ends_stream() {
    let config = ReaderTailerConfig {
        source: Some("stdin".into()),
        queue_size: 4,
        ..Default::default()
    };
    let input = Failing {
        chunks: vec![b"hello\n".to_vec()],
    };
    let mut tailer = ReaderTailer::from_blocking(input, config).unwrap();

    let (lines, errors) = split(drain(&mut tailer).await);
    assert_eq!(lines, ["hello"]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Read);
    assert_eq!(errors[0].context(), "stdin");
    assert!(matches!(errors[0].cause(), RecordError::Io(_)));

    tailer.close().await.unwrap();
}

#[tokio::test]
async fn test_blocking_input_until_eof() {
    let (feed, input) = blocking_input();
    let mut tailer = ReaderTailer::from_blocking(input, ReaderTailerConfig::default()).unwrap();

    feed.send(b"split ".to_vec()).unwrap();
    feed.send(b"across reads\nsecond\n".to_vec()).unwrap();
    drop(feed);

    let (lines, errors) = split(drain(&mut tailer).await);
    assert_eq!(lines, ["split across reads", "second"]);
    assert!(errors.is_empty());

    tailer.close().await.unwrap();
}

#[test]
fn test_idle_blocking_input_does_not_hold_runtime() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (feed, input) = blocking_input();

    runtime.block_on(async {
        let mut tailer =
            ReaderTailer::from_blocking(input, ReaderTailerConfig::default()).unwrap();
        feed.send(b"hello\n".to_vec()).unwrap();

        let line = tokio::time::timeout(WAIT, tailer.lines().recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.line(), "hello");

        // Input thread is now parked in a read that never returns
        tokio::time::timeout(WAIT, tailer.close()).await.unwrap().unwrap();
    });

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        drop(runtime);
        let _ = done_tx.send(());
    });
    assert!(
        done_rx.recv_timeout(WAIT).is_ok(),
        "runtime shutdown blocked on idle input"
    );

    // Unblocks the input thread
    drop(feed);
}

#[tokio::test]
async fn test_waits_for_consumer() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let mut tailer = ReaderTailer::spawn(BufReader::new(reader), ReaderTailerConfig::default())
        .unwrap();

    writer.write_all(b"one\ntwo\nthree\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Queue holds one line; the rest wait in the reader
    assert_eq!(tailer.metrics().snapshot().lines_sent, 1);

    for expected in ["one", "two", "three"] {
        let line = tokio::time::timeout(WAIT, tailer.lines().recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.line(), expected);
    }

    tailer.close().await.unwrap();
}

#[tokio::test]
async fn test_close_stops_open_reader() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let mut tailer = ReaderTailer::spawn(BufReader::new(reader), ReaderTailerConfig::default())
        .unwrap();

    writer.write_all(b"before close\n").await.unwrap();
    let line = tokio::time::timeout(WAIT, tailer.lines().recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.line(), "before close");

    // Writer is still open, so the reader would wait forever
    tokio::time::timeout(WAIT, tailer.close()).await.unwrap().unwrap();

    writer.write_all(b"after close\n").await.ok();
    assert!(tailer.lines().recv().await.is_none());
    assert!(tailer.errors().recv().await.is_none());

    // Second close is a no-op
    tailer.close().await.unwrap();
}
