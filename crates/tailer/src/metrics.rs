//! Tailer delivery counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every tailer's outbound channels
#[derive(Debug, Default)]
pub struct TailerMetrics {
    /// Lines accepted by the line channel
    pub lines_sent: AtomicU64,

    /// Errors accepted by the error channel
    pub errors_sent: AtomicU64,

    /// Sends that failed because the consumer side was gone
    pub undeliverable: AtomicU64,
}

impl TailerMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            lines_sent: AtomicU64::new(0),
            errors_sent: AtomicU64::new(0),
            undeliverable: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn line_sent(&self) {
        self.lines_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error_sent(&self) {
        self.errors_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn undeliverable(&self) {
        self.undeliverable.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> TailerMetricsSnapshot {
        TailerMetricsSnapshot {
            lines_sent: self.lines_sent.load(Ordering::Relaxed),
            errors_sent: self.errors_sent.load(Ordering::Relaxed),
            undeliverable: self.undeliverable.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of tailer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailerMetricsSnapshot {
    pub lines_sent: u64,
    pub errors_sent: u64,
    pub undeliverable: u64,
}
