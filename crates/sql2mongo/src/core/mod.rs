//! Core abstractions for the transfer pipeline.
//!
//! - [`value`]: dynamically-typed column values
//! - [`row`]: raw and normalized row containers
//! - [`traits`]: source reader, row cursor and document sink seams
//! - [`catalog`]: source adapter registry for dependency injection
//!
//! Driver modules (`drivers/mysql`, `drivers/postgres`, `drivers/mongo`)
//! implement these traits; the transfer engine only depends on this module.

pub mod catalog;
pub mod row;
pub mod traits;
pub mod value;

pub use catalog::{ConnectOptions, SourceCatalog, SourceOpener};
pub use row::{NormalizedRow, Row, ID_FIELD, SOURCE_ID_COLUMN};
pub use traits::{DocumentSink, ReadOptions, ReplaceOutcome, RowCursor, SourceReader};
pub use value::SqlValue;
