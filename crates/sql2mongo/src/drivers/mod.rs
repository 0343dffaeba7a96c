//! Source and destination adapters.
//!
//! - [`mysql`]: MySQL/MariaDB source (feature `mysql`)
//! - [`postgres`]: PostgreSQL source (feature `postgres`)
//! - [`mongo`]: MongoDB destination
//! - [`memory`]: in-memory source and sink
//! - [`common`]: TLS settings and the channel-backed cursor
//!
//! # Adding a Source
//!
//! 1. Create a module under `drivers/` implementing `SourceReader`
//! 2. Gate it with a feature flag in `Cargo.toml`
//! 3. Register an opener in `SourceCatalog::with_builtins()`

pub mod common;
pub mod memory;
pub mod mongo;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{ChannelCursor, SslMode};
#[cfg(feature = "postgres")]
pub use common::TlsBuilder;
pub use memory::{MemoryCursor, MemorySink, MemorySource};
pub use mongo::MongoSink;
#[cfg(feature = "mysql")]
pub use mysql::MysqlReader;
#[cfg(feature = "postgres")]
pub use postgres::PostgresReader;
