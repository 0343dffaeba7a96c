//! Run statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Written and failed row counters for one run.
///
/// Both counters only ever grow. Workers update them concurrently, so they
/// are atomics rather than plain integers.
#[derive(Debug, Default)]
pub struct RunStatistics {
    written: AtomicU64,
    failed: AtomicU64,
}

impl RunStatistics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one row as written or failed.
    pub fn record(&self, written: bool) {
        if written {
            self.written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one row as failed.
    pub fn record_failed(&self) {
        self.record(false);
    }

    /// Rows written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Rows failed so far.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Rows seen so far.
    pub fn total(&self) -> u64 {
        self.written() + self.failed()
    }
}
