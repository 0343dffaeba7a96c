//! In-memory source and sink.
//!
//! Used by the test-suite and by dry runs of the pipeline. The source
//! replays a fixed list of rows (optionally with scan failures mixed in);
//! the sink keeps documents in a vector keyed by `_id` and can be told to
//! reject or stall writes for specific identifiers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::row::{NormalizedRow, Row};
use crate::core::traits::{DocumentSink, ReadOptions, ReplaceOutcome, RowCursor, SourceReader};
use crate::core::value::SqlValue;
use crate::error::{LoadError, Result};

/// Source that replays a fixed set of rows.
#[derive(Default)]
pub struct MemorySource {
    rows: Vec<std::result::Result<Row, String>>,
    open_error: Option<String>,
    last_read: Mutex<Option<ReadOptions>>,
    closed: AtomicBool,
}

impl MemorySource {
    /// Source over rows that all scan cleanly.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    /// Source whose `Err` entries surface as row scan failures.
    pub fn with_results(rows: Vec<std::result::Result<Row, String>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Make `open_cursor` fail, as a missing table would.
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Options passed to the most recent `open_cursor`.
    pub async fn last_read(&self) -> Option<ReadOptions> {
        self.last_read.lock().await.clone()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn open_cursor(&self, opts: ReadOptions) -> Result<Box<dyn RowCursor>> {
        *self.last_read.lock().await = Some(opts.clone());

        if let Some(message) = &self.open_error {
            return Err(LoadError::source_open(message, format!("cursor on {}", opts.table)));
        }

        let mut queue = VecDeque::with_capacity(self.rows.len());
        for entry in &self.rows {
            let item = match entry {
                Ok(row) => match &opts.columns {
                    Some(columns) => Ok(project(row, columns, &opts.table)?),
                    None => Ok(row.clone()),
                },
                Err(message) => Err(LoadError::RowScan(message.clone())),
            };
            queue.push_back(item);
        }

        Ok(Box::new(MemoryCursor { rows: queue }))
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Keep only `columns`, failing the way a database rejects an unknown column.
fn project(row: &Row, columns: &[String], table: &str) -> Result<Row> {
    let mut projected = Row::with_capacity(columns.len());
    for column in columns {
        let value = row.get(column).ok_or_else(|| {
            LoadError::source_open(
                format!("unknown column '{}'", column),
                format!("cursor on {}", table),
            )
        })?;
        projected.insert(column.as_str(), value.clone());
    }
    Ok(projected)
}

/// Cursor over a queue of prepared rows.
pub struct MemoryCursor {
    rows: VecDeque<Result<Row>>,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    async fn advance(&mut self) -> Option<Result<Row>> {
        self.rows.pop_front()
    }

    async fn close(&mut self) {
        self.rows.clear();
    }
}

/// Sink that stores documents in memory.
#[derive(Default)]
pub struct MemorySink {
    documents: Mutex<Vec<NormalizedRow>>,
    rejected_ids: Vec<SqlValue>,
    stalled_ids: Vec<SqlValue>,
    stall: Duration,
    closed: AtomicBool,
}

impl MemorySink {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection pre-populated with documents.
    pub fn with_documents(documents: Vec<NormalizedRow>) -> Self {
        Self {
            documents: Mutex::new(documents),
            ..Self::default()
        }
    }

    /// Reject every write whose row carries this `_id`.
    pub fn reject_id(mut self, id: impl Into<SqlValue>) -> Self {
        self.rejected_ids.push(id.into());
        self
    }

    /// Hold writes for this `_id` for `stall` before completing them.
    pub fn stall_id(mut self, id: impl Into<SqlValue>, stall: Duration) -> Self {
        self.stalled_ids.push(id.into());
        self.stall = stall;
        self
    }

    /// Snapshot of the stored documents, in write order.
    pub async fn documents(&self) -> Vec<NormalizedRow> {
        self.documents.lock().await.clone()
    }

    /// Stored document with this `_id`.
    pub async fn find_by_id(&self, id: &SqlValue) -> Option<NormalizedRow> {
        self.documents
            .lock()
            .await
            .iter()
            .find(|doc| doc.id() == Some(id))
            .cloned()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn check_faults(&self, row: &NormalizedRow) -> Result<()> {
        let Some(id) = row.id() else {
            return Ok(());
        };
        if self.stalled_ids.contains(id) {
            tokio::time::sleep(self.stall).await;
        }
        if self.rejected_ids.contains(id) {
            return Err(LoadError::Write(format!("document _id {} rejected", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn insert_one(&self, row: &NormalizedRow) -> Result<()> {
        self.check_faults(row).await?;
        let mut documents = self.documents.lock().await;
        if let Some(id) = row.id() {
            if documents.iter().any(|doc| doc.id() == Some(id)) {
                return Err(LoadError::Write(format!("duplicate key _id {}", id)));
            }
        }
        documents.push(row.clone());
        Ok(())
    }

    async fn replace_by_id(
        &self,
        id: &SqlValue,
        row: &NormalizedRow,
        upsert: bool,
    ) -> Result<ReplaceOutcome> {
        self.check_faults(row).await?;
        let mut documents = self.documents.lock().await;
        match documents.iter_mut().find(|doc| doc.id() == Some(id)) {
            Some(existing) => {
                *existing = row.clone();
                Ok(ReplaceOutcome::Replaced)
            }
            None if upsert => {
                documents.push(row.clone());
                Ok(ReplaceOutcome::Inserted)
            }
            None => Ok(ReplaceOutcome::NotFound),
        }
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
