//! Shared key-value store for test data with lifecycle cleanup hooks.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use testkit_core::Result;

/// When a store's contents are torn down relative to the test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Never cleared automatically.
    None,
    /// Cleared after every test.
    PerTest,
    /// Cleared when the suite finishes.
    PerSuite,
    /// Cleared when the file's tests finish.
    PerFile,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IsolationLevel::None => "none",
            IsolationLevel::PerTest => "per_test",
            IsolationLevel::PerSuite => "per_suite",
            IsolationLevel::PerFile => "per_file",
        };
        write!(f, "{}", s)
    }
}

/// Async teardown hook registered on a store.
pub type CleanupHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct StoreInner {
    values: HashMap<String, Value>,
    handlers: Vec<CleanupHandler>,
}

/// Thread-safe key-value store shared between tests.
///
/// Cloning yields another handle to the same underlying data.
#[derive(Clone)]
pub struct TestDataStore {
    level: IsolationLevel,
    inner: Arc<Mutex<StoreInner>>,
}

impl TestDataStore {
    pub fn new(level: IsolationLevel) -> Self {
        Self {
            level,
            inner: Arc::new(Mutex::new(StoreInner {
                values: HashMap::new(),
                handlers: Vec::new(),
            })),
        }
    }

    pub fn level(&self) -> IsolationLevel {
        self.level
    }

    /// Stores a value under a key, replacing any previous value.
    pub fn set(&self, key: &str, value: Value) {
        self.inner.lock().values.insert(key.to_string(), value);
    }

    /// Returns a copy of the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().values.get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.lock().values.contains_key(key)
    }

    /// Removes a key, returning true if it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().values.remove(key).is_some()
    }

    /// Removes all values. Cleanup handlers are not affected.
    pub fn clear(&self) {
        self.inner.lock().values.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }

    /// Registers an async handler to run when this store is cleaned up.
    ///
    /// Handlers run in registration order.
    pub fn on_cleanup<F, Fut>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: CleanupHandler = Arc::new(move || Box::pin(handler()));
        self.inner.lock().handlers.push(handler);
    }

    /// Runs every registered cleanup handler in registration order.
    ///
    /// A failing handler is logged and skipped; the remaining handlers
    /// still run. Handlers stay registered afterwards.
    pub async fn run_cleanup(&self) {
        let handlers: Vec<CleanupHandler> = self.inner.lock().handlers.clone();
        debug!(
            "Running {} cleanup handler(s) for {} store",
            handlers.len(),
            self.level
        );
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler().await {
                warn!("Cleanup handler {} failed: {}", index, e);
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub fn clear_handlers(&self) {
        self.inner.lock().handlers.clear();
    }

    /// Captures a copy of all current values.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.lock().values.clone()
    }

    /// Replaces all values with the given snapshot.
    pub fn restore(&self, snapshot: HashMap<String, Value>) {
        self.inner.lock().values = snapshot;
    }
}

impl fmt::Debug for TestDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TestDataStore")
            .field("level", &self.level)
            .field("values", &inner.values.len())
            .field("handlers", &inner.handlers.len())
            .finish()
    }
}
