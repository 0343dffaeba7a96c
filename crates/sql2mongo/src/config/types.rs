//! Configuration type definitions.
//!
//! Field names are snake_case; the capitalised keys used by older JSON job
//! files (`Jobs`, `WriteOperation`, `SqlType`, `SQL`, `Mongo`, ...) are
//! accepted as aliases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Named transfer jobs.
    #[serde(alias = "Jobs")]
    pub jobs: Vec<JobConfig>,

    /// Engine settings shared by all jobs.
    #[serde(default, alias = "Settings")]
    pub settings: Settings,
}

/// One named transfer job as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job name, selected with `--job`.
    #[serde(alias = "Name")]
    pub name: String,

    /// Human-readable description shown by `--list`.
    #[serde(default, alias = "Description")]
    pub description: String,

    /// Optional SQL filter appended to the source query as a WHERE clause.
    #[serde(default, alias = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Disabled jobs cannot be run or listed.
    #[serde(default, alias = "Enabled")]
    pub enabled: bool,

    /// insert, update or upsert. Absent or empty means upsert.
    #[serde(default, alias = "WriteOperation", skip_serializing_if = "Option::is_none")]
    pub write_operation: Option<String>,

    /// Source adapter tag (e.g. "mysql", "pgsql").
    #[serde(alias = "SqlType")]
    pub source_type: String,

    /// Relational source credentials.
    #[serde(alias = "SQL")]
    pub source: Credential,

    /// Document destination credentials.
    #[serde(alias = "Mongo")]
    pub destination: Credential,
}

/// Connection credentials for either side of a job.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Optional label, informational only.
    #[serde(default, alias = "Name")]
    pub name: String,

    /// Host, optionally with `:port`. MongoDB accepts a comma-separated seed list.
    #[serde(alias = "Host")]
    pub host: String,

    /// Explicit port; overrides a port embedded in `host`.
    #[serde(default, alias = "Port", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username. Empty means no authentication.
    #[serde(default, alias = "Username", alias = "user")]
    pub username: String,

    /// Password.
    #[serde(default, alias = "Password")]
    pub password: String,

    /// Database name.
    #[serde(alias = "Database")]
    pub database: String,

    /// Source table or destination collection.
    #[serde(alias = "Table", alias = "collection")]
    pub table: String,

    /// Column projection for the source query. All columns when absent.
    #[serde(default, alias = "Columns", skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    /// Text encoding of source blobs (WHATWG label). UTF-8 when absent.
    #[serde(default, alias = "Encoding", skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// TLS mode for SQL sources: disable, require, verify-ca, verify-full.
    #[serde(default = "default_ssl_mode", alias = "SslMode")]
    pub ssl_mode: String,
}

// Manual Debug so passwords never reach the logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("encoding", &self.encoding)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Concurrent normalize+write workers. 1 keeps strict cursor order.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Rows buffered between the cursor and the workers.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Upper bound on a single cursor advance or document write, in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Upper bound on establishing a connection, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            channel_capacity: default_channel_capacity(),
            operation_timeout_secs: default_operation_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Destination write policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Always create a new document.
    Insert,

    /// Replace the document with the row's `_id`; fail if none exists.
    Update,

    /// Replace the document with the row's `_id`, creating it if missing.
    #[default]
    Upsert,
}

impl WriteMode {
    /// Resolve the configured write operation. Absent or blank means upsert.
    pub fn resolve(operation: Option<&str>) -> Option<Self> {
        match operation.map(str::trim) {
            None | Some("") => Some(WriteMode::Upsert),
            Some(op) => op.parse().ok(),
        }
    }

    /// Lowercase name as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Insert => "insert",
            WriteMode::Update => "update",
            WriteMode::Upsert => "upsert",
        }
    }

    /// Whether the mode addresses an existing document by `_id`.
    pub fn requires_identifier(&self) -> bool {
        !matches!(self, WriteMode::Insert)
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "insert" => Ok(WriteMode::Insert),
            "update" => Ok(WriteMode::Update),
            "upsert" => Ok(WriteMode::Upsert),
            other => Err(format!("unknown write mode '{}'", other)),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, runnable job.
///
/// Produced by [`Config::job`](super::Config::job); the write mode is already
/// resolved so nothing downstream re-validates it.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub name: String,
    pub description: String,
    pub condition: Option<String>,
    pub write_mode: WriteMode,
    pub source_type: String,
    pub source: Credential,
    pub destination: Credential,
}

// Default value functions for serde
fn default_workers() -> usize {
    1
}

fn default_channel_capacity() -> usize {
    256
}

fn default_operation_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}
