//! Row transfer pipeline.
//!
//! - [`RowNormalizer`]: blob-to-text and `id` to `_id` rules
//! - [`DocumentWriter`]: write-mode dispatch against a [`DocumentSink`](crate::core::DocumentSink)
//! - [`TransferEngine`]: the per-row loop, sequential or with a writer pool
//! - [`RunStatistics`]: written/failed counters
//!
//! A row is counted exactly once: written, or failed (unreadable, rejected,
//! missing `_id`, not found, timed out). Nothing is retried.

mod engine;
mod normalize;
mod stats;
mod writer;

pub use engine::{TransferConfig, TransferEngine};
pub use normalize::{normalize, RowNormalizer};
pub use stats::RunStatistics;
pub use writer::{DocumentWriter, DEFAULT_WRITE_TIMEOUT};
