//! Lazily-built stores, one per isolation level.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::scoped::ScopedTestData;
use crate::store::{IsolationLevel, TestDataStore};

/// Hands out the shared store for each isolation level.
///
/// Stores are created on first use; asking twice for the same level
/// returns handles to the same data.
pub struct StoreRegistry {
    stores: Mutex<HashMap<IsolationLevel, TestDataStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// The store for a level, creating it if needed.
    pub fn store(&self, level: IsolationLevel) -> TestDataStore {
        self.stores
            .lock()
            .entry(level)
            .or_insert_with(|| TestDataStore::new(level))
            .clone()
    }

    /// A scoped view over the store for a level.
    pub fn scoped(&self, level: IsolationLevel, scope: &str) -> ScopedTestData {
        ScopedTestData::new(self.store(level), scope)
    }

    /// Levels that have a store so far.
    pub fn active_levels(&self) -> Vec<IsolationLevel> {
        self.stores.lock().keys().copied().collect()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}
