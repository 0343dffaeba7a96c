//! Error types for the transfer library.

use thiserror::Error;

/// Process exit code for configuration and job-selection errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for source database errors.
pub const EXIT_SOURCE_ERROR: u8 = 2;
/// Process exit code for destination errors.
pub const EXIT_DESTINATION_ERROR: u8 = 3;
/// Process exit code for a cancelled run.
pub const EXIT_CANCELLED: u8 = 4;
/// Process exit code for filesystem errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for transfer operations.
///
/// Setup-time variants abort a run before any row is processed. The per-row
/// variants (`RowScan`, `Write`, `MissingIdentifier`, `NotFound`,
/// `WriteTimeout`) are logged and counted by the transfer engine instead of
/// being propagated.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No job with this name exists in the configuration
    #[error("Job '{0}' does not exist. Perhaps --list?")]
    UnknownJob(String),

    /// The job exists but is disabled
    #[error("Job '{0}' is disabled")]
    JobDisabled(String),

    /// Write operation is not one of insert, update, upsert
    #[error("Write operation '{operation}' for job {job} is invalid (expected insert, update or upsert)")]
    InvalidWriteMode { job: String, operation: String },

    /// No source adapter is registered for this type tag
    #[error("Source type '{source_type}' is not supported. Pick one of: {supported}")]
    UnsupportedSourceType {
        source_type: String,
        supported: String,
    },

    /// The source connection or cursor could not be opened
    #[error("Failed to open source {context}: {message}")]
    SourceOpen { context: String, message: String },

    /// The destination connection could not be opened
    #[error("Failed to open destination {context}: {message}")]
    SinkOpen { context: String, message: String },

    /// A row could not be scanned from the cursor
    #[error("Row scan failed: {0}")]
    RowScan(String),

    /// The cursor did not advance within the configured timeout
    #[error("Source cursor stalled for more than {0}s")]
    CursorTimeout(u64),

    /// The destination rejected a write
    #[error("Write rejected: {0}")]
    Write(String),

    /// update/upsert needs an `_id` the row does not have
    #[error("Row has no _id field, required for {0}")]
    MissingIdentifier(&'static str),

    /// update matched no existing document
    #[error("No document matches _id {0}")]
    NotFound(String),

    /// A write did not complete within the configured timeout
    #[error("Write timed out after {0}s")]
    WriteTimeout(u64),

    /// MongoDB driver error
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// MySQL driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] sqlx::Error),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Transfer cancelled")]
    Cancelled,
}

impl LoadError {
    /// Create a SourceOpen error with context about where it occurred
    pub fn source_open(message: impl ToString, context: impl Into<String>) -> Self {
        LoadError::SourceOpen {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a SinkOpen error with context about where it occurred
    pub fn sink_open(message: impl ToString, context: impl Into<String>) -> Self {
        LoadError::SinkOpen {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Whether this error only affects a single row.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            LoadError::RowScan(_)
                | LoadError::Write(_)
                | LoadError::MissingIdentifier(_)
                | LoadError::NotFound(_)
                | LoadError::WriteTimeout(_)
        )
    }

    /// Map the error to a process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::Config(_)
            | LoadError::UnknownJob(_)
            | LoadError::JobDisabled(_)
            | LoadError::InvalidWriteMode { .. }
            | LoadError::UnsupportedSourceType { .. }
            | LoadError::Yaml(_)
            | LoadError::Json(_) => EXIT_CONFIG_ERROR,
            LoadError::SourceOpen { .. } | LoadError::RowScan(_) | LoadError::CursorTimeout(_) => {
                EXIT_SOURCE_ERROR
            }
            #[cfg(feature = "mysql")]
            LoadError::Mysql(_) => EXIT_SOURCE_ERROR,
            #[cfg(feature = "postgres")]
            LoadError::Postgres(_) => EXIT_SOURCE_ERROR,
            LoadError::SinkOpen { .. }
            | LoadError::Mongo(_)
            | LoadError::Write(_)
            | LoadError::MissingIdentifier(_)
            | LoadError::NotFound(_)
            | LoadError::WriteTimeout(_) => EXIT_DESTINATION_ERROR,
            LoadError::Cancelled => EXIT_CANCELLED,
            LoadError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, LoadError>;
