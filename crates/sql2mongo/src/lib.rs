//! # sql2mongo
//!
//! Bulk transfer of relational table rows into MongoDB collections.
//!
//! A job names a source table (MySQL or PostgreSQL), a destination
//! collection and a write mode. Every row is read once, normalized for
//! document storage and written with exactly one operation:
//!
//! - **Normalization**: binary blobs become text in the source's encoding,
//!   and an `id` column becomes the `_id` document key
//! - **Write modes**: `insert`, `update` (replace by `_id`) and `upsert`
//! - **Per-row accounting**: failed rows are logged and counted, never
//!   retried, and never stop the run
//! - **Worker pool**: optional parallel writers behind a single cursor
//!
//! ## Example
//!
//! ```rust,no_run
//! use sql2mongo::{Config, Orchestrator, SourceCatalog};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> sql2mongo::Result<()> {
//!     let config = Config::load("sql2mongo.yaml")?;
//!     let job = config.job("users")?;
//!     let catalog = SourceCatalog::with_builtins();
//!     let runner = Orchestrator::connect(job, &catalog, &config.settings).await?;
//!     let outcome = runner.run(CancellationToken::new()).await?;
//!     println!("Load completed with {} rows written", outcome);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod pipeline;

// Re-exports for convenient access
pub use config::{Config, Credential, JobConfig, JobDescriptor, Settings, WriteMode};
pub use crate::core::{
    DocumentSink, NormalizedRow, ReadOptions, Row, RowCursor, SourceCatalog, SourceReader,
    SqlValue,
};
pub use error::{LoadError, Result};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use pipeline::{normalize, DocumentWriter, RowNormalizer, RunStatistics, TransferConfig, TransferEngine};
