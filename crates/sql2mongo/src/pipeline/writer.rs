//! Document writer: one normalized row, one write.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::WriteMode;
use crate::core::row::NormalizedRow;
use crate::core::traits::{DocumentSink, ReplaceOutcome};
use crate::error::{LoadError, Result};

/// Default bound on a single write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches rows to the sink according to the job's write mode.
///
/// - `insert` creates a document unconditionally.
/// - `update` replaces the document with the row's `_id`; no match is a
///   failure.
/// - `upsert` replaces or creates the document with the row's `_id`.
///
/// Rows without an `_id` fail under `update` and `upsert`.
#[derive(Debug, Clone, Copy)]
pub struct DocumentWriter {
    mode: WriteMode,
    timeout: Duration,
}

impl DocumentWriter {
    /// Create a writer for a write mode.
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode,
            timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Bound every write by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The write mode.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Perform the write, returning why it failed.
    pub async fn try_write(&self, sink: &dyn DocumentSink, row: &NormalizedRow) -> Result<()> {
        let write = async {
            match self.mode {
                WriteMode::Insert => sink.insert_one(row).await,
                WriteMode::Update | WriteMode::Upsert => {
                    let id = row
                        .id()
                        .ok_or(LoadError::MissingIdentifier(self.mode.as_str()))?;
                    let upsert = self.mode == WriteMode::Upsert;
                    match sink.replace_by_id(id, row, upsert).await? {
                        ReplaceOutcome::Replaced | ReplaceOutcome::Inserted => Ok(()),
                        ReplaceOutcome::NotFound => Err(LoadError::NotFound(id.to_string())),
                    }
                }
            }
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| LoadError::WriteTimeout(self.timeout.as_secs()))?
    }

    /// Perform the write; failures are logged and reported as `false`.
    pub async fn write(&self, sink: &dyn DocumentSink, row: &NormalizedRow) -> bool {
        match self.try_write(sink, row).await {
            Ok(()) => {
                debug!("{} ok", self.mode);
                true
            }
            Err(e) => {
                match row.id() {
                    Some(id) => warn!("{} of _id {} failed: {}", self.mode, id, e),
                    None => warn!("{} failed: {}", self.mode, e),
                }
                false
            }
        }
    }
}
