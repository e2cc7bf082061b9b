//! Test-support toolkit for HTTP applications.
//!
//! Brings the pieces together: an HTTP client with cookie-jar sessions
//! and retries, a seeded deterministic data factory, database adapters
//! with a uniform cleanup/reset lifecycle, and scoped test-data stores
//! cleared at test boundaries through a [`TestContext`].

pub mod context;

pub use context::TestContext;

pub use testkit_core::runtime::{
    environment_info, DatabaseCapabilities, EnvironmentInfo, RuntimeEnv,
};
pub use testkit_core::{Error, Result};

pub use testkit_client::{
    ClientConfig, CookieJar, Dispatch, EmailRecord, FallbackDispatch, HistoryEntry,
    HttpTestClient, Outbox, RemoteDispatch, RequestOptions, RouterDispatch, TestRequest,
    TestResponse,
};

pub use testkit_db::{
    create_adapter, detect_best_provider, AdapterConfig, DatabaseAdapter,
    EmbeddedFileAdapter, MemoryAdapter, MemoryTables, OrmAdapter, ProviderKind,
    RemoteManagedAdapter, SqliteHandle,
};

pub use testkit_factory::{DataFactory, FactoryConfig, TestUser, UserOverrides};

pub use testkit_store::{IsolationLevel, ScopedTestData, StoreRegistry, TestDataStore};

/// The names most tests want in scope.
pub mod prelude {
    pub use crate::context::TestContext;
    pub use testkit_client::{HttpTestClient, Outbox, RequestOptions};
    pub use testkit_core::{Error, Result};
    pub use testkit_db::{create_adapter, AdapterConfig, DatabaseAdapter, ProviderKind};
    pub use testkit_factory::DataFactory;
    pub use testkit_store::IsolationLevel;
}
