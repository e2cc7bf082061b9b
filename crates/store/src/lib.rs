//! Scoped test-data stores with isolation-level lifecycles.

pub mod registry;
pub mod scoped;
pub mod store;

pub use registry::StoreRegistry;
pub use scoped::{ScopedTestData, DEFAULT_SNAPSHOT};
pub use store::{CleanupHandler, IsolationLevel, TestDataStore};
