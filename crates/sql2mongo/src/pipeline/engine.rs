//! Per-row driving loop.
//!
//! With one worker the loop pulls, normalizes and writes rows strictly in
//! cursor order. With more, the calling task stays the only consumer of the
//! cursor and hands rows to a pool of writer tasks over a bounded channel;
//! write order is then unspecified.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Settings, WriteMode};
use crate::core::row::Row;
use crate::core::traits::{DocumentSink, RowCursor};
use crate::error::{LoadError, Result};

use super::normalize::RowNormalizer;
use super::stats::RunStatistics;
use super::writer::DocumentWriter;

/// Log a progress line every this many rows.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Number of writer tasks. 1 keeps cursor order.
    pub workers: usize,
    /// Rows buffered between the cursor and the writers.
    pub channel_capacity: usize,
    /// Bound on each cursor advance and each write.
    pub operation_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            channel_capacity: 256,
            operation_timeout: Duration::from_secs(30),
        }
    }
}

impl TransferConfig {
    /// Build from the `settings` block of the configuration file.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            workers: settings.workers.max(1),
            channel_capacity: settings.channel_capacity.max(1),
            operation_timeout: Duration::from_secs(settings.operation_timeout_secs),
        }
    }
}

/// Moves rows from a cursor into a sink.
pub struct TransferEngine {
    normalizer: RowNormalizer,
    writer: DocumentWriter,
    config: TransferConfig,
    stats: Arc<RunStatistics>,
}

impl TransferEngine {
    /// Create a new transfer engine.
    pub fn new(normalizer: RowNormalizer, mode: WriteMode, config: TransferConfig) -> Self {
        Self {
            normalizer,
            writer: DocumentWriter::new(mode).with_timeout(config.operation_timeout),
            config,
            stats: Arc::new(RunStatistics::new()),
        }
    }

    /// Counters for this engine's run.
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Drain the cursor into the sink.
    ///
    /// Per-row failures are counted, never returned. The run itself fails
    /// only on cancellation or when the cursor stops responding.
    pub async fn execute(
        &self,
        cursor: &mut dyn RowCursor,
        sink: Arc<dyn DocumentSink>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let start = Instant::now();
        info!(
            "Starting transfer (mode: {}, workers: {})",
            self.writer.mode(),
            self.config.workers
        );

        let result = if self.config.workers <= 1 {
            self.run_sequential(cursor, sink.as_ref(), cancel).await
        } else {
            self.run_parallel(cursor, sink, cancel).await
        };

        let elapsed = start.elapsed();
        let total = self.stats.total();
        let rows_per_sec = if elapsed.as_secs_f64() > 0.0 {
            (total as f64 / elapsed.as_secs_f64()) as u64
        } else {
            0
        };
        info!(
            "Transfer finished: {} written, {} failed in {:?} ({} rows/sec)",
            self.stats.written(),
            self.stats.failed(),
            elapsed,
            rows_per_sec
        );

        result
    }

    async fn run_sequential(
        &self,
        cursor: &mut dyn RowCursor,
        sink: &dyn DocumentSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        while let Some(item) = self.next_row(cursor, cancel).await? {
            match item {
                Ok(row) => {
                    let document = self.normalizer.normalize(row);
                    let written = self.writer.write(sink, &document).await;
                    self.stats.record(written);
                }
                Err(e) => self.skip_unreadable(e),
            }
            self.report_progress();
        }
        Ok(())
    }

    async fn run_parallel(
        &self,
        cursor: &mut dyn RowCursor,
        sink: Arc<dyn DocumentSink>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (row_tx, row_rx) = async_channel::bounded::<Row>(self.config.channel_capacity);

        let mut handles = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let row_rx = row_rx.clone();
            let sink = Arc::clone(&sink);
            let stats = Arc::clone(&self.stats);
            let normalizer = self.normalizer;
            let writer = self.writer;
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let mut local_rows = 0u64;
                while let Ok(row) = row_rx.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let document = normalizer.normalize(row);
                    stats.record(writer.write(sink.as_ref(), &document).await);
                    local_rows += 1;
                }
                debug!("Writer {} done after {} rows", worker_id, local_rows);
            }));
        }

        // Drop our copy so the channel closes when all writers are done.
        drop(row_rx);

        let mut result = Ok(());
        loop {
            let item = match self.next_row(cursor, cancel).await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            };
            match item {
                Ok(row) => {
                    if row_tx.send(row).await.is_err() {
                        // Every writer has exited.
                        break;
                    }
                }
                Err(e) => self.skip_unreadable(e),
            }
            self.report_progress();
        }

        // Close the channel so writers finish once the queue is drained.
        drop(row_tx);

        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                error!("Writer {} panicked: {}", worker_id, e);
            }
        }

        result
    }

    /// Pull the next cursor item, honouring cancellation and the timeout.
    async fn next_row(
        &self,
        cursor: &mut dyn RowCursor,
        cancel: &CancellationToken,
    ) -> Result<Option<Result<Row>>> {
        let timeout = self.config.operation_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Cancellation requested, stopping before the next row");
                Err(LoadError::Cancelled)
            }
            next = tokio::time::timeout(timeout, cursor.advance()) => {
                next.map_err(|_| LoadError::CursorTimeout(timeout.as_secs()))
            }
        }
    }

    fn skip_unreadable(&self, e: LoadError) {
        warn!("Skipping unreadable row: {}", e);
        self.stats.record_failed();
    }

    fn report_progress(&self) {
        let seen = self.stats.total();
        if seen > 0 && seen % PROGRESS_INTERVAL == 0 {
            info!("{} rows processed ({} failed)", seen, self.stats.failed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{ReadOptions, SourceReader};
    use crate::core::value::SqlValue;
    use crate::drivers::{MemorySink, MemorySource};

    fn rows(n: i64) -> Vec<Row> {
        (1..=n)
            .map(|i| [("id", SqlValue::Int(i)), ("n", SqlValue::Int(i * 10))].into_iter().collect())
            .collect()
    }

    async fn run(
        source: MemorySource,
        sink: Arc<MemorySink>,
        mode: WriteMode,
        config: TransferConfig,
        cancel: CancellationToken,
    ) -> (Result<()>, u64, u64) {
        let engine = TransferEngine::new(RowNormalizer::default(), mode, config);
        let mut cursor = source.open_cursor(ReadOptions::for_table("t")).await.unwrap();
        let result = engine.execute(cursor.as_mut(), sink, &cancel).await;
        let stats = engine.statistics();
        (result, stats.written(), stats.failed())
    }

    #[tokio::test]
    async fn test_sequential_counts_every_row_once() {
        let sink = Arc::new(MemorySink::new().reject_id(2i64));
        let (result, written, failed) = run(
            MemorySource::new(rows(3)),
            sink.clone(),
            WriteMode::Upsert,
            TransferConfig::default(),
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!((written, failed), (2, 1));
        let ids: Vec<_> = sink.documents().await.iter().map(|d| d.id().cloned()).collect();
        assert_eq!(ids, vec![Some(SqlValue::Int(1)), Some(SqlValue::Int(3))]);
    }

    #[tokio::test]
    async fn test_scan_errors_count_as_failed() {
        let source = MemorySource::with_results(vec![
            Ok(rows(1).remove(0)),
            Err("bad packet".into()),
        ]);
        let (result, written, failed) = run(
            source,
            Arc::new(MemorySink::new()),
            WriteMode::Insert,
            TransferConfig::default(),
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!((written, failed), (1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_writes_everything() {
        let sink = Arc::new(MemorySink::new().reject_id(50i64));
        let config = TransferConfig {
            workers: 4,
            channel_capacity: 8,
            ..TransferConfig::default()
        };
        let (result, written, failed) = run(
            MemorySource::new(rows(200)),
            sink.clone(),
            WriteMode::Upsert,
            config,
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!((written, failed), (199, 1));
        assert_eq!(sink.documents().await.len(), 199);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sink = Arc::new(MemorySink::new());
        let (result, written, failed) = run(
            MemorySource::new(rows(3)),
            sink.clone(),
            WriteMode::Upsert,
            TransferConfig::default(),
            cancel,
        )
        .await;
        assert!(matches!(result, Err(LoadError::Cancelled)));
        assert_eq!((written, failed), (0, 0));
        assert!(sink.documents().await.is_empty());
    }

    struct StalledCursor;

    #[async_trait::async_trait]
    impl RowCursor for StalledCursor {
        async fn advance(&mut self) -> Option<Result<Row>> {
            std::future::pending().await
        }

        async fn close(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_cursor_times_out() {
        let config = TransferConfig {
            operation_timeout: Duration::from_secs(5),
            ..TransferConfig::default()
        };
        let engine = TransferEngine::new(RowNormalizer::default(), WriteMode::Upsert, config);
        let result = engine
            .execute(
                &mut StalledCursor,
                Arc::new(MemorySink::new()),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(LoadError::CursorTimeout(5))));
    }
}
