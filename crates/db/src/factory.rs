//! Builds adapters from configuration and picks the best provider for
//! the detected environment.

use std::sync::Arc;

use tracing::info;

use testkit_core::runtime::DatabaseCapabilities;
use testkit_core::{Error, Result};

use crate::adapter::{DatabaseAdapter, ProviderKind};
use crate::memory::{MemoryAdapter, MemoryTables};
use crate::orm::OrmAdapter;
use crate::sqlite::{EmbeddedFileAdapter, RemoteManagedAdapter, SqliteHandle};

/// Options for [`create_adapter`]. Only the fields the chosen provider
/// needs have to be filled in; the rest stay `None`.
#[derive(Clone, Default)]
pub struct AdapterConfig {
    pub provider: Option<ProviderKind>,
    /// Database file path, for the embedded-file provider.
    pub path: Option<String>,
    /// Display URL for a host-managed database.
    pub url: Option<String>,
    /// Externally owned connection, for the remote-managed provider.
    pub handle: Option<SqliteHandle>,
    /// Concrete adapter for the ORM providers to wrap.
    pub wrapped: Option<Arc<dyn DatabaseAdapter>>,
    /// Seed data for the memory provider, snapshotted at initialize.
    pub seed_tables: Option<MemoryTables>,
}

impl AdapterConfig {
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }
}

/// Constructs the adapter a config asks for.
///
/// Missing required fields fail here, before any connection work
/// happens, with an error naming what was absent.
pub fn create_adapter(config: AdapterConfig) -> Result<Arc<dyn DatabaseAdapter>> {
    let provider = config
        .provider
        .ok_or_else(|| Error::Configuration("no database provider selected".to_string()))?;

    let adapter: Arc<dyn DatabaseAdapter> = match provider {
        ProviderKind::Memory => {
            let adapter = match config.seed_tables {
                Some(tables) => MemoryAdapter::with_tables(tables),
                None => MemoryAdapter::new(),
            };
            Arc::new(adapter)
        }
        ProviderKind::EmbeddedFile => {
            let path = config.path.ok_or_else(|| {
                Error::Configuration(
                    "embedded_file adapter requires a database path".to_string(),
                )
            })?;
            Arc::new(EmbeddedFileAdapter::new(path))
        }
        ProviderKind::RemoteManaged => {
            let handle = config.handle.ok_or_else(|| {
                Error::Configuration(
                    "remote_managed adapter requires an external connection handle"
                        .to_string(),
                )
            })?;
            let mut adapter = RemoteManagedAdapter::new(handle);
            if let Some(url) = config.url {
                adapter = adapter.with_url(url);
            }
            Arc::new(adapter)
        }
        ProviderKind::OrmEmbedded | ProviderKind::OrmRemote => {
            let wrapped = config.wrapped.ok_or_else(|| {
                Error::Configuration(format!(
                    "{} adapter requires a concrete adapter to wrap",
                    provider
                ))
            })?;
            let orm = OrmAdapter::new(wrapped)?;
            if orm.provider() != provider {
                return Err(Error::Configuration(format!(
                    "requested {} but the wrapped adapter makes it {}",
                    provider,
                    orm.provider()
                )));
            }
            Arc::new(orm)
        }
    };

    info!("Created {} database adapter", adapter.provider());
    Ok(adapter)
}

/// Picks the strongest provider the environment supports.
///
/// A host-managed handle beats an embedded driver; with neither, the
/// memory backend always works.
pub fn detect_best_provider(capabilities: &DatabaseCapabilities) -> ProviderKind {
    if capabilities.managed_handle {
        ProviderKind::RemoteManaged
    } else if capabilities.embedded_driver {
        ProviderKind::EmbeddedFile
    } else {
        ProviderKind::Memory
    }
}
