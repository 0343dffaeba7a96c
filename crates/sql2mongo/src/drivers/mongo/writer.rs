//! MongoDB document sink.
//!
//! Each normalized row becomes one BSON document; field order follows the
//! source column order. `replace_by_id` is a whole-document replace keyed on
//! `_id`, never a partial `$set`.

use async_trait::async_trait;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{doc, Binary, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::config::Credential;
use crate::core::catalog::ConnectOptions;
use crate::core::row::{NormalizedRow, ID_FIELD};
use crate::core::traits::{DocumentSink, ReplaceOutcome};
use crate::core::value::SqlValue;
use crate::error::{LoadError, Result};

/// Writes documents into one MongoDB collection.
pub struct MongoSink {
    client: Client,
    collection: Collection<Document>,
}

impl MongoSink {
    /// Connect to the deployment named by the credential and ping the
    /// target database.
    pub async fn connect(cred: &Credential, opts: &ConnectOptions) -> Result<Self> {
        let context = format!("mongodb {}", cred.display_target());

        let mut options = ClientOptions::parse(cred.mongo_uri())
            .await
            .map_err(|e| LoadError::sink_open(e, &context))?;
        options.app_name = Some("sql2mongo".to_string());
        options.connect_timeout = Some(opts.connect_timeout);
        options.server_selection_timeout = Some(opts.connect_timeout);
        options.max_pool_size = Some(opts.max_connections.max(1) as u32);

        let client = Client::with_options(options).map_err(|e| LoadError::sink_open(e, &context))?;
        let database = client.database(&cred.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| LoadError::sink_open(e, &context))?;

        info!(
            "Connected to MongoDB destination: {}/{}.{}",
            cred.host, cred.database, cred.table
        );

        Ok(Self {
            collection: database.collection(&cred.table),
            client,
        })
    }
}

#[async_trait]
impl DocumentSink for MongoSink {
    async fn insert_one(&self, row: &NormalizedRow) -> Result<()> {
        self.collection
            .insert_one(to_document(row))
            .await
            .map_err(|e| LoadError::Write(e.to_string()))?;
        Ok(())
    }

    async fn replace_by_id(
        &self,
        id: &SqlValue,
        row: &NormalizedRow,
        upsert: bool,
    ) -> Result<ReplaceOutcome> {
        let mut filter = Document::new();
        filter.insert(ID_FIELD, to_bson(id));

        let result = self
            .collection
            .replace_one(filter, to_document(row))
            .upsert(upsert)
            .await
            .map_err(|e| LoadError::Write(e.to_string()))?;

        let outcome = if result.matched_count > 0 {
            ReplaceOutcome::Replaced
        } else if result.upserted_id.is_some() {
            ReplaceOutcome::Inserted
        } else {
            ReplaceOutcome::NotFound
        };
        debug!("replace _id {}: {:?}", id, outcome);
        Ok(outcome)
    }

    fn db_type(&self) -> &str {
        "mongodb"
    }

    async fn close(&self) {
        self.client.clone().shutdown().immediate(true).await;
    }
}

/// Build the BSON document for a row.
pub fn to_document(row: &NormalizedRow) -> Document {
    let mut document = Document::new();
    for (name, value) in row.iter() {
        document.insert(name, to_bson(value));
    }
    document
}

/// Map a column value to BSON.
///
/// Integers are stored as 64-bit longs and timestamps as UTC datetimes at
/// millisecond precision.
pub fn to_bson(value: &SqlValue) -> Bson {
    match value {
        SqlValue::Null => Bson::Null,
        SqlValue::Bool(v) => Bson::Boolean(*v),
        SqlValue::Int(v) => Bson::Int64(*v),
        SqlValue::Float(v) => Bson::Double(*v),
        SqlValue::Text(v) => Bson::String(v.clone()),
        SqlValue::Blob(v) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: v.clone(),
        }),
        SqlValue::Timestamp(v) => {
            Bson::DateTime(BsonDateTime::from_millis(v.and_utc().timestamp_millis()))
        }
    }
}
