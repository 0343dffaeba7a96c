//! Core traits for the transfer pipeline.
//!
//! - [`SourceReader`]: an open relational source that hands out cursors
//! - [`RowCursor`]: a forward-only, single-pass row sequence
//! - [`DocumentSink`]: the write primitives of a document collection
//!
//! Source adapters (MySQL, PostgreSQL, in-memory) are interchangeable
//! implementations of the first two; the writer only talks to the third.

use async_trait::async_trait;

use crate::error::Result;

use super::row::{NormalizedRow, Row};
use super::value::SqlValue;

/// Options for opening a cursor over a table.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Table name.
    pub table: String,
    /// Columns to project. `None` selects all columns.
    pub columns: Option<Vec<String>>,
    /// Optional WHERE clause.
    pub where_clause: Option<String>,
    /// Rows buffered ahead of the consumer.
    pub prefetch: usize,
}

impl ReadOptions {
    /// Read every column of `table`.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            where_clause: None,
            prefetch: 256,
        }
    }

    /// Restrict the projection to `columns`.
    pub fn with_columns(mut self, columns: Option<Vec<String>>) -> Self {
        self.columns = columns;
        self
    }

    /// Filter rows with a WHERE clause.
    pub fn with_where(mut self, clause: Option<String>) -> Self {
        self.where_clause = clause;
        self
    }

    /// Set how many rows the cursor may read ahead.
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch.max(1);
        self
    }

    /// Build the SELECT statement with the given identifier quoting.
    pub fn build_select(&self, quote: impl Fn(&str) -> String) -> String {
        let cols = match &self.columns {
            Some(cols) => cols.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
            None => "*".to_string(),
        };
        // `schema.table` is quoted part by part.
        let table = self
            .table
            .split('.')
            .map(|part| quote(part))
            .collect::<Vec<_>>()
            .join(".");
        let mut sql = format!("SELECT {} FROM {}", cols, table);
        if let Some(clause) = self.where_clause.as_deref().filter(|c| !c.is_empty()) {
            sql.push_str(&format!(" WHERE ({})", clause));
        }
        sql
    }
}

/// Forward-only, finite, non-restartable sequence of rows.
///
/// Once `advance` has returned `None` it keeps returning `None`. Callers
/// must not advance the same cursor from more than one task.
#[async_trait]
pub trait RowCursor: Send {
    /// Pull the next row.
    ///
    /// `Some(Err(_))` is a row that could not be scanned; the cursor may
    /// still have more rows after it.
    async fn advance(&mut self) -> Option<Result<Row>>;

    /// Stop producing rows and release the underlying query.
    async fn close(&mut self);
}

/// An open relational source.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Open a cursor over a table.
    ///
    /// Fails if the table or projection is invalid; that failure is fatal to
    /// the run.
    async fn open_cursor(&self, opts: ReadOptions) -> Result<Box<dyn RowCursor>>;

    /// Get the database type identifier (e.g., "mysql", "pgsql").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// Result of a replace-by-identifier write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// An existing document was replaced.
    Replaced,
    /// No document matched and a new one was created (upsert only).
    Inserted,
    /// No document matched and none was created.
    NotFound,
}

/// Write primitives of a destination collection.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Create a new document from the row.
    async fn insert_one(&self, row: &NormalizedRow) -> Result<()>;

    /// Replace the document whose `_id` equals `id`, optionally creating it.
    async fn replace_by_id(
        &self,
        id: &SqlValue,
        row: &NormalizedRow,
        upsert: bool,
    ) -> Result<ReplaceOutcome>;

    /// Destination type identifier (e.g., "mongodb").
    fn db_type(&self) -> &str;

    /// Close the client.
    async fn close(&self);
}
