//! Job runner: opens both ends, drives the transfer, closes both ends.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{JobDescriptor, Settings};
use crate::core::catalog::{ConnectOptions, SourceCatalog};
use crate::core::traits::{DocumentSink, ReadOptions, SourceReader};
use crate::drivers::MongoSink;
use crate::error::Result;
use crate::pipeline::{RowNormalizer, TransferConfig, TransferEngine};

/// Runs a single job.
pub struct Orchestrator {
    job: JobDescriptor,
    source: Box<dyn SourceReader>,
    sink: Arc<dyn DocumentSink>,
    normalizer: RowNormalizer,
    config: TransferConfig,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unique run identifier.
    pub run_id: String,

    /// Job name.
    pub job: String,

    /// Rows written to the destination.
    pub written: u64,

    /// Rows that could not be read or written.
    pub failed: u64,

    /// Rows seen (`written + failed`).
    pub total: u64,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,
}

impl Orchestrator {
    /// Open the job's source through the catalog and its MongoDB destination.
    ///
    /// The source type is checked before anything is connected. If the
    /// destination can't be opened the already-open source is closed again.
    pub async fn connect(
        job: JobDescriptor,
        catalog: &SourceCatalog,
        settings: &Settings,
    ) -> Result<Self> {
        catalog.require(&job.source_type)?;

        let connect_timeout = Duration::from_secs(settings.connect_timeout_secs);
        let source_opts = ConnectOptions {
            connect_timeout,
            ..ConnectOptions::default()
        };
        let sink_opts = ConnectOptions {
            connect_timeout,
            max_connections: settings.workers.max(1),
        };

        let source = catalog
            .open(&job.source_type, &job.source, source_opts)
            .await?;

        let sink = match MongoSink::connect(&job.destination, &sink_opts).await {
            Ok(sink) => sink,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };

        Ok(Self::with_endpoints(job, source, Arc::new(sink))
            .with_transfer_config(TransferConfig::from_settings(settings)))
    }

    /// Build a runner over already-open endpoints.
    pub fn with_endpoints(
        job: JobDescriptor,
        source: Box<dyn SourceReader>,
        sink: Arc<dyn DocumentSink>,
    ) -> Self {
        // The label was checked when the configuration was validated.
        let encoding = job.source.text_encoding().unwrap_or(encoding_rs::UTF_8);
        Self {
            normalizer: RowNormalizer::default().with_encoding(encoding),
            config: TransferConfig::default(),
            job,
            source,
            sink,
        }
    }

    /// Toggle the two normalization rules (both on by default).
    pub fn with_conversions(mut self, convert_bytes: bool, convert_id: bool) -> Self {
        self.normalizer.convert_bytes_to_string = convert_bytes;
        self.normalizer.convert_id_to_underscore_id = convert_id;
        self
    }

    /// Replace the transfer settings.
    pub fn with_transfer_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the job to completion.
    ///
    /// Source and destination are closed before this returns, whether the
    /// run succeeded or not.
    pub async fn run(self, cancel: CancellationToken) -> Result<RunOutcome> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Starting job {} ({}): {} {} -> mongodb {} [{}]",
            self.job.name,
            run_id,
            self.source.db_type(),
            self.job.source.display_target(),
            self.job.destination.display_target(),
            self.job.write_mode
        );

        let opts = ReadOptions::for_table(self.job.source.table.clone())
            .with_columns(self.job.source.columns.clone())
            .with_where(self.job.condition.clone())
            .with_prefetch(self.config.channel_capacity);

        let engine = TransferEngine::new(self.normalizer, self.job.write_mode, self.config.clone());

        let result = match self.source.open_cursor(opts).await {
            Ok(mut cursor) => {
                let result = engine
                    .execute(cursor.as_mut(), Arc::clone(&self.sink), &cancel)
                    .await;
                cursor.close().await;
                result
            }
            Err(e) => Err(e),
        };

        self.source.close().await;
        self.sink.close().await;

        let stats = engine.statistics();
        if let Err(e) = result {
            error!(
                "Job {} aborted after {} written, {} failed: {}",
                self.job.name,
                stats.written(),
                stats.failed(),
                e
            );
            return Err(e);
        }

        let duration = start.elapsed().as_secs_f64();
        let total = stats.total();
        let outcome = RunOutcome {
            run_id,
            job: self.job.name.clone(),
            written: stats.written(),
            failed: stats.failed(),
            total,
            duration_seconds: duration,
            rows_per_second: if duration > 0.0 {
                (total as f64 / duration) as u64
            } else {
                0
            },
            started_at,
            completed_at: Utc::now(),
        };

        if outcome.failed > 0 {
            warn!("Job {}: {} rows failed", outcome.job, outcome.failed);
        }
        info!(
            "Job {} completed: {} rows in {:.1}s ({} rows/s)",
            outcome.job, outcome, outcome.duration_seconds, outcome.rows_per_second
        );

        Ok(outcome)
    }
}

impl RunOutcome {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.written, self.total)
    }
}
