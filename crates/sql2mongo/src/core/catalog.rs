//! Source catalog for explicit dependency injection.
//!
//! The [`SourceCatalog`] maps a job's `source_type` tag to a function that
//! opens a [`SourceReader`]. It is constructed once at startup and passed to
//! the orchestrator; there is no global registry and no registration by
//! side effect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::Credential;
use crate::error::{LoadError, Result};

use super::traits::SourceReader;

/// Connection parameters shared by every source adapter.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Pool size.
    pub max_connections: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_connections: 2,
        }
    }
}

/// Opens a source from credentials.
pub type SourceOpener = Arc<
    dyn Fn(Credential, ConnectOptions) -> BoxFuture<'static, Result<Box<dyn SourceReader>>>
        + Send
        + Sync,
>;

/// Registry of source adapters keyed by source type tag.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = SourceCatalog::with_builtins();
/// let reader = catalog.open("mysql", credential, ConnectOptions::default()).await?;
/// ```
#[derive(Default, Clone)]
pub struct SourceCatalog {
    openers: HashMap<String, SourceOpener>,
}

impl SourceCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the adapters compiled into this build.
    ///
    /// `mysql` is registered with the `mysql` feature; `pgsql` (alias
    /// `postgres`) with the `postgres` feature.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut catalog = Self::new();

        #[cfg(feature = "mysql")]
        catalog.register("mysql", open_mysql);

        #[cfg(feature = "postgres")]
        {
            catalog.register("pgsql", open_postgres);
            catalog.register("postgres", open_postgres);
        }

        catalog
    }

    /// Register an opener for a source type tag.
    pub fn register<F>(&mut self, source_type: impl Into<String>, opener: F)
    where
        F: Fn(Credential, ConnectOptions) -> BoxFuture<'static, Result<Box<dyn SourceReader>>>
            + Send
            + Sync
            + 'static,
    {
        self.openers.insert(source_type.into(), Arc::new(opener));
    }

    /// Check if a source type is registered.
    pub fn has_source_type(&self, source_type: &str) -> bool {
        self.openers.contains_key(source_type)
    }

    /// Registered source type tags, sorted.
    pub fn source_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.openers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get the opener for a source type, or an error listing the known ones.
    pub fn require(&self, source_type: &str) -> Result<SourceOpener> {
        self.openers
            .get(source_type)
            .cloned()
            .ok_or_else(|| LoadError::UnsupportedSourceType {
                source_type: source_type.to_string(),
                supported: self.source_types().join(", "),
            })
    }

    /// Open a source of the given type.
    pub async fn open(
        &self,
        source_type: &str,
        credential: &Credential,
        opts: ConnectOptions,
    ) -> Result<Box<dyn SourceReader>> {
        let opener = self.require(source_type)?;
        opener(credential.clone(), opts).await
    }
}

#[cfg(feature = "mysql")]
fn open_mysql(
    cred: Credential,
    opts: ConnectOptions,
) -> BoxFuture<'static, Result<Box<dyn SourceReader>>> {
    async move {
        crate::drivers::MysqlReader::connect(&cred, &opts)
            .await
            .map(|r| Box::new(r) as Box<dyn SourceReader>)
    }
    .boxed()
}

#[cfg(feature = "postgres")]
fn open_postgres(
    cred: Credential,
    opts: ConnectOptions,
) -> BoxFuture<'static, Result<Box<dyn SourceReader>>> {
    async move {
        crate::drivers::PostgresReader::connect(&cred, &opts)
            .await
            .map(|r| Box::new(r) as Box<dyn SourceReader>)
    }
    .boxed()
}
