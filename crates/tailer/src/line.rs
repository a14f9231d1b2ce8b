//! Line and ingestion error types
//!
//! These are the only values a consumer ever sees from a tailer.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::syslog::{ParseError, ServerError};

/// One decoded unit of log content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    line: String,
    source: Option<PathBuf>,
}

impl Line {
    /// Create a line with no source identifier (network transports)
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            source: None,
        }
    }

    /// Create a line that remembers where it was read from
    pub fn with_source(line: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            line: line.into(),
            source: Some(source.into()),
        }
    }

    /// The raw text content
    #[inline]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Originating file or stream, if the transport has one
    #[inline]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Consume the line, returning its text
    pub fn into_line(self) -> String {
        self.line
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Category of an ingestion error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Record could not be decoded, or has no usable content field
    ContentMissing,
    /// Underlying reader failed
    Read,
    /// Transport never came up (best-effort startup only)
    Startup,
    /// Anything else
    NotSpecified,
}

impl ErrorKind {
    /// Short, stable name for logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentMissing => "content missing/invalid",
            Self::Read => "read failed",
            Self::Startup => "startup failed",
            Self::NotSpecified => "not specified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of a rejected record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Decoded record has no content field
    #[error("no content field")]
    NoContent,

    /// Content field present but not text
    #[error("content field is {found}, expected text")]
    ContentNotText { found: &'static str },

    /// Listener could not decode the record
    #[error("malformed record: {0}")]
    Decode(#[from] ParseError),

    /// Reader I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport failed to listen or boot
    #[error("transport unavailable: {0}")]
    Startup(#[source] ServerError),
}

/// A classified, non-fatal failure while ingesting one record
#[derive(Debug)]
pub struct IngestionError {
    kind: ErrorKind,
    cause: RecordError,
    context: String,
}

impl IngestionError {
    /// Create a new ingestion error
    ///
    /// `context` is free text such as a source path; pass `""` when there is none.
    pub fn new(kind: ErrorKind, cause: impl Into<RecordError>, context: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
            context: context.into(),
        }
    }

    /// Error category
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Underlying cause
    #[inline]
    pub fn cause(&self) -> &RecordError {
        &self.cause
    }

    /// Context string, empty when not applicable
    #[inline]
    pub fn context(&self) -> &str {
        &self.context
    }
}

impl fmt::Display for IngestionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}: {}", self.kind, self.cause)
        } else {
            write!(f, "{} ({}): {}", self.kind, self.context, self.cause)
        }
    }
}

impl std::error::Error for IngestionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
