//! The per-run context that replaces process-wide singletons.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use testkit_core::runtime::RuntimeEnv;
use testkit_db::DatabaseAdapter;
use testkit_factory::DataFactory;
use testkit_store::{IsolationLevel, ScopedTestData, StoreRegistry, TestDataStore};

/// Owns the shared test state for one test run.
///
/// Built once by the lifecycle driver and passed to whatever needs it:
/// the store registry, the seeded data factory, the runtime capability
/// descriptor, and optionally the database adapter under management.
/// The boundary drivers (`end_test`, `end_suite`, `end_file`) run the
/// matching store's cleanup handlers and clear it; `end_test` also
/// resets the attached adapter.
pub struct TestContext {
    stores: StoreRegistry,
    factory: Arc<Mutex<DataFactory>>,
    runtime: RuntimeEnv,
    adapter: Mutex<Option<Arc<dyn DatabaseAdapter>>>,
}

impl TestContext {
    /// Context with the runtime detected from the environment.
    pub fn new() -> Self {
        Self::with_runtime(RuntimeEnv::detect())
    }

    /// Context with an explicit capability descriptor, for callers
    /// that decide capabilities themselves.
    pub fn with_runtime(runtime: RuntimeEnv) -> Self {
        Self {
            stores: StoreRegistry::new(),
            factory: Arc::new(Mutex::new(DataFactory::new())),
            runtime,
            adapter: Mutex::new(None),
        }
    }

    /// Context whose factory starts from the given seed.
    pub fn with_seed(seed: u64) -> Self {
        let context = Self::new();
        context.factory.lock().set_seed(seed);
        context
    }

    pub fn runtime(&self) -> &RuntimeEnv {
        &self.runtime
    }

    /// The shared store for an isolation level.
    pub fn store(&self, level: IsolationLevel) -> TestDataStore {
        self.stores.store(level)
    }

    /// A scoped view over the store for an isolation level.
    pub fn scoped(&self, level: IsolationLevel, scope: &str) -> ScopedTestData {
        self.stores.scoped(level, scope)
    }

    /// The shared seeded factory. Lock it to generate.
    pub fn factory(&self) -> Arc<Mutex<DataFactory>> {
        self.factory.clone()
    }

    /// Puts a database adapter under this context's lifecycle; it will
    /// be reset at every `end_test`.
    pub fn attach_adapter(&self, adapter: Arc<dyn DatabaseAdapter>) {
        debug!("Attached {} adapter to context", adapter.provider());
        *self.adapter.lock() = Some(adapter);
    }

    pub fn adapter(&self) -> Option<Arc<dyn DatabaseAdapter>> {
        self.adapter.lock().clone()
    }

    /// Removes the attached adapter without closing it.
    pub fn detach_adapter(&self) -> Option<Arc<dyn DatabaseAdapter>> {
        self.adapter.lock().take()
    }

    /// Test boundary: per-test store handlers run and the store is
    /// cleared, then the attached adapter is reset. A reset failure is
    /// logged, never propagated, so one broken resource cannot fail
    /// unrelated teardown.
    pub async fn end_test(&self) {
        self.end_boundary(IsolationLevel::PerTest).await;
        if let Some(adapter) = self.adapter() {
            if let Err(e) = adapter.reset().await {
                warn!("Database reset failed during test teardown: {}", e);
            }
        }
    }

    /// Suite boundary: per-suite store handlers run, then it clears.
    pub async fn end_suite(&self) {
        self.end_boundary(IsolationLevel::PerSuite).await;
    }

    /// File boundary: per-file store handlers run, then it clears.
    pub async fn end_file(&self) {
        self.end_boundary(IsolationLevel::PerFile).await;
    }

    async fn end_boundary(&self, level: IsolationLevel) {
        let store = self.stores.store(level);
        store.run_cleanup().await;
        store.clear();
        debug!("Cleared {} store", level);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
