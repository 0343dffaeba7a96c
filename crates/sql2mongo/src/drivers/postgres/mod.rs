//! PostgreSQL source adapter.
//!
//! Uses deadpool-postgres for pooling and `query_raw` for row streaming.
//! Only available with the `postgres` feature.

mod reader;

pub use reader::PostgresReader;
