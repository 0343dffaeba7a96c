//! MySQL/MariaDB source reader.
//!
//! Streams the job's SELECT through a SQLx pool and converts each row into
//! the dynamic [`SqlValue`] set by the column's reported type name.

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::Credential;
use crate::core::catalog::ConnectOptions;
use crate::core::row::Row;
use crate::core::traits::{ReadOptions, RowCursor, SourceReader};
use crate::core::value::SqlValue;
use crate::drivers::common::{ChannelCursor, SslMode};
use crate::error::{LoadError, Result};

const DEFAULT_PORT: u16 = 3306;

/// MySQL/MariaDB source reader.
pub struct MysqlReader {
    pool: MySqlPool,
}

impl MysqlReader {
    /// Connect to the database named by the credential and verify the
    /// connection.
    pub async fn connect(cred: &Credential, opts: &ConnectOptions) -> Result<Self> {
        let (host, port) = cred.host_port(DEFAULT_PORT);
        let ssl_mode = SslMode::parse(&cred.ssl_mode)?;
        let context = format!("mysql {}", cred.display_target());

        let options = MySqlConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&cred.database)
            .username(&cred.username)
            .password(&cred.password)
            .ssl_mode(ssl_mode.to_mysql());

        let pool = MySqlPoolOptions::new()
            .max_connections(opts.max_connections.max(1) as u32)
            .acquire_timeout(opts.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| LoadError::source_open(e, &context))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| LoadError::source_open(e, &context))?;

        info!("Connected to MySQL source: {}:{}/{}", host, port, cred.database);

        Ok(Self { pool })
    }

    /// Quote a MySQL identifier.
    fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }
}

#[async_trait]
impl SourceReader for MysqlReader {
    async fn open_cursor(&self, opts: ReadOptions) -> Result<Box<dyn RowCursor>> {
        let sql = opts.build_select(Self::quote_ident);

        // A bad table, column or condition fails here instead of as a scan error.
        sqlx::query(&format!("{} LIMIT 0", sql))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoadError::source_open(e, format!("cursor on {}", opts.table)))?;

        debug!("Opening MySQL cursor: {}", sql);

        let pool = self.pool.clone();
        let cursor = ChannelCursor::spawn(opts.prefetch, move |tx| async move {
            let mut stream = sqlx::query(&sql).fetch(&pool);
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
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Convert a MySQL row into a [`Row`], keeping column order.
fn convert_row(row: &MySqlRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = convert_value(row, idx, column.type_info().name())
            .map_err(|e| LoadError::RowScan(format!("column {}: {}", column.name(), e)))?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

fn convert_value(
    row: &MySqlRow,
    idx: usize,
    type_name: &str,
) -> std::result::Result<SqlValue, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = type_name.to_uppercase();
    let value = match type_name.as_str() {
        "BOOLEAN" => SqlValue::Bool(row.try_get::<bool, _>(idx)?),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            SqlValue::Int(row.try_get::<i64, _>(idx)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let v = row.try_get::<u64, _>(idx)?;
            // Values past i64::MAX only fit as text.
            i64::try_from(v)
                .map(SqlValue::Int)
                .unwrap_or_else(|_| SqlValue::Text(v.to_string()))
        }

        "FLOAT" => SqlValue::Float(row.try_get::<f32, _>(idx)?.into()),
        "DOUBLE" => SqlValue::Float(row.try_get::<f64, _>(idx)?),
        "DECIMAL" => SqlValue::Text(row.try_get::<rust_decimal::Decimal, _>(idx)?.to_string()),

        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            SqlValue::Text(row.try_get::<String, _>(idx)?)
        }
        "JSON" => SqlValue::Text(row.try_get::<serde_json::Value, _>(idx)?.to_string()),

        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            SqlValue::Blob(row.try_get::<Vec<u8>, _>(idx)?)
        }

        "DATE" => row.try_get::<chrono::NaiveDate, _>(idx)?.into(),
        "DATETIME" => SqlValue::Timestamp(row.try_get::<chrono::NaiveDateTime, _>(idx)?),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)?
            .into(),
        "TIME" => SqlValue::Text(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string()),

        // YEAR, BIT, GEOMETRY and anything newer: text if it decodes as
        // text, raw bytes otherwise.
        _ => match row.try_get::<String, _>(idx) {
            Ok(s) => SqlValue::Text(s),
            Err(_) => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        },
    };
    Ok(value)
}
