//! PostgreSQL source reader.
//!
//! The SELECT is prepared up front so that a missing table or column fails
//! when the cursor is opened; rows are then streamed with `query_raw` on a
//! pooled connection owned by the producer task.

use std::error::Error as StdError;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use futures::StreamExt;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{debug, info, warn};

use crate::config::Credential;
use crate::core::catalog::ConnectOptions;
use crate::core::row::Row;
use crate::core::traits::{ReadOptions, RowCursor, SourceReader};
use crate::core::value::SqlValue;
use crate::drivers::common::{ChannelCursor, SslMode, TlsBuilder};
use crate::error::{LoadError, Result};

const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL source reader.
pub struct PostgresReader {
    pool: Pool,
}

impl PostgresReader {
    /// Connect to the database named by the credential and verify the
    /// connection.
    pub async fn connect(cred: &Credential, opts: &ConnectOptions) -> Result<Self> {
        let (host, port) = cred.host_port(DEFAULT_PORT);
        let context = format!("pgsql {}", cred.display_target());

        let mut pg_config = PgConfig::new();
        pg_config.host(&host);
        pg_config.port(port);
        pg_config.dbname(&cred.database);
        pg_config.user(&cred.username);
        pg_config.password(&cred.password);
        pg_config.connect_timeout(opts.connect_timeout);
        pg_config.application_name("sql2mongo");

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let ssl_mode = SslMode::parse(&cred.ssl_mode)?;
        let mgr = match TlsBuilder::new(ssl_mode).build()? {
            Some(tls) => Manager::from_config(pg_config, tls, mgr_config),
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                Manager::from_config(pg_config, NoTls, mgr_config)
            }
        };

        let pool = Pool::builder(mgr)
            .max_size(opts.max_connections.max(1))
            .build()
            .map_err(|e| LoadError::source_open(e, &context))?;

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| LoadError::source_open(e, &context))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| LoadError::source_open(e, &context))?;

        info!("Connected to PostgreSQL source: {}:{}/{}", host, port, cred.database);

        Ok(Self { pool })
    }
}

#[async_trait]
impl SourceReader for PostgresReader {
    async fn open_cursor(&self, opts: ReadOptions) -> Result<Box<dyn RowCursor>> {
        let context = format!("cursor on {}", opts.table);
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| LoadError::source_open(e, &context))?;

        let sql = opts.build_select(quote_ident);
        let statement = client
            .prepare(&sql)
            .await
            .map_err(|e| LoadError::source_open(e, &context))?;

        debug!("Opening PostgreSQL cursor: {}", sql);

        let cursor = ChannelCursor::spawn(opts.prefetch, move |tx| async move {
            let stream = match client.query_raw(&statement, Vec::<String>::new()).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(Err(LoadError::RowScan(e.to_string()))).await;
                    return;
                }
            };
            let mut stream = Box::pin(stream);
            while let Some(item) = stream.next().await {
                // A driver error means the stream is gone; a conversion
                // error only loses this row.
                let (converted, lost) = match item {
                    Ok(row) => (convert_row(&row), false),
                    Err(e) => (Err(LoadError::RowScan(e.to_string())), true),
                };
                if tx.send(converted).await.is_err() || lost {
                    break;
                }
            }
        });

        Ok(Box::new(cursor))
    }

    fn db_type(&self) -> &str {
        "pgsql"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// Quote a PostgreSQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert a PostgreSQL row into a [`Row`], keeping column order.
fn convert_row(row: &tokio_postgres::Row) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = convert_value(row, idx, column.type_())
            .map_err(|e| LoadError::RowScan(format!("column {}: {}", column.name(), e)))?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

fn convert_value(
    row: &tokio_postgres::Row,
    idx: usize,
    ty: &Type,
) -> std::result::Result<SqlValue, tokio_postgres::Error> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| SqlValue::Int(v.into()))
            .unwrap_or(SqlValue::Null),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::NUMERIC => row
            .try_get::<_, Option<rust_decimal::Decimal>>(idx)?
            .map(|d| d.to_string())
            .into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx)?.into()
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        Type::DATE => row.try_get::<_, Option<chrono::NaiveDate>>(idx)?.into(),
        Type::TIMESTAMP => row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?.into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .into(),
        Type::TIME => row
            .try_get::<_, Option<chrono::NaiveTime>>(idx)?
            .map(|t| t.to_string())
            .into(),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(idx)?
            .map(|u| u.to_string())
            .into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|v| v.to_string())
            .into(),
        // Arrays, ranges, network types and extensions arrive as their
        // binary wire encoding.
        _ => row
            .try_get::<_, Option<WireBytes>>(idx)?
            .map(|w| SqlValue::Blob(w.0))
            .unwrap_or(SqlValue::Null),
    };
    Ok(value)
}

/// Undecoded column payload for types without a dedicated mapping.
struct WireBytes(Vec<u8>);

impl<'a> FromSql<'a> for WireBytes {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(WireBytes(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_select_uses_double_quotes() {
        let opts = ReadOptions::for_table("public.orders").with_where(Some("total > 10".into()));
        assert_eq!(
            opts.build_select(quote_ident),
            "SELECT * FROM \"public\".\"orders\" WHERE (total > 10)"
        );
    }

    #[test]
    fn test_wire_bytes_accepts_anything() {
        assert!(WireBytes::accepts(&Type::INET));
        let raw = WireBytes::from_sql(&Type::INET, &[1, 2, 3]).unwrap();
        assert_eq!(raw.0, vec![1, 2, 3]);
    }
}
