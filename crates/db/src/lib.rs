//! Database adapters with a uniform cleanup/reset lifecycle.

pub mod adapter;
pub mod factory;
pub mod memory;
pub mod orm;
pub mod sqlite;

pub use adapter::{DatabaseAdapter, ProviderKind};
pub use factory::{create_adapter, detect_best_provider, AdapterConfig};
pub use memory::{MemoryAdapter, MemoryTables};
pub use orm::OrmAdapter;
pub use sqlite::{EmbeddedFileAdapter, RemoteManagedAdapter, SqliteHandle};
