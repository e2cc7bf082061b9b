//! ORM-layer adapter that forwards everything to a wrapped concrete adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use testkit_core::{Error, Result};

use crate::adapter::{DatabaseAdapter, ProviderKind};

/// Delegating adapter standing in for an ORM layer.
///
/// Wraps an embedded-file or remote-managed adapter and forwards the
/// whole lifecycle to it, so cleanup logic lives in one place. The
/// provider tag reflects the wrapped connection type.
pub struct OrmAdapter {
    wrapped: Arc<dyn DatabaseAdapter>,
    kind: ProviderKind,
}

impl OrmAdapter {
    /// Fails unless the wrapped adapter is embedded-file or
    /// remote-managed; those are the only connection types an ORM
    /// layer sits on.
    pub fn new(wrapped: Arc<dyn DatabaseAdapter>) -> Result<Self> {
        let kind = match wrapped.provider() {
            ProviderKind::EmbeddedFile => ProviderKind::OrmEmbedded,
            ProviderKind::RemoteManaged => ProviderKind::OrmRemote,
            other => {
                return Err(Error::Configuration(format!(
                    "orm adapter cannot wrap a {} adapter",
                    other
                )))
            }
        };
        Ok(Self { wrapped, kind })
    }

    pub fn wrapped(&self) -> &Arc<dyn DatabaseAdapter> {
        &self.wrapped
    }
}

#[async_trait]
impl DatabaseAdapter for OrmAdapter {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    async fn initialize(&self) -> Result<()> {
        debug!("Initializing {} via wrapped adapter", self.kind);
        self.wrapped.initialize().await
    }

    async fn cleanup(&self) -> Result<()> {
        self.wrapped.cleanup().await
    }

    async fn reset(&self) -> Result<()> {
        self.wrapped.reset().await
    }

    async fn is_ready(&self) -> bool {
        self.wrapped.is_ready().await
    }

    async fn close(&self) -> Result<()> {
        self.wrapped.close().await
    }

    async fn put(&self, table: &str, key: &str, value: Value) -> Result<()> {
        self.wrapped.put(table, key, value).await
    }

    async fn fetch(&self, table: &str, key: &str) -> Result<Option<Value>> {
        self.wrapped.fetch(table, key).await
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.wrapped.table_names().await
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        self.wrapped.row_count(table).await
    }
}
