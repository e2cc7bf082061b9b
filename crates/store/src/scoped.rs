//! Prefix-scoped view over a store, with named snapshots.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use testkit_core::{Error, Result};

use crate::store::TestDataStore;

/// Snapshot name used when none is given.
pub const DEFAULT_SNAPSHOT: &str = "default";

/// A named slice of a [`TestDataStore`].
///
/// Keys are namespaced as `<scope>:<key>` in the backing store, so
/// scopes sharing a store never see each other's data. Snapshots are
/// local to the scope and survive `clear`.
pub struct ScopedTestData {
    store: TestDataStore,
    scope: String,
    snapshots: HashMap<String, HashMap<String, Value>>,
}

impl ScopedTestData {
    pub fn new(store: TestDataStore, scope: &str) -> Self {
        Self {
            store,
            scope: scope.to_string(),
            snapshots: HashMap::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn prefix(&self) -> String {
        format!("{}:", self.scope)
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}:{}", self.scope, key)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.store.set(&self.scoped_key(key), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(&self.scoped_key(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.has(&self.scoped_key(key))
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.delete(&self.scoped_key(key))
    }

    /// Keys in this scope, with the scope prefix stripped.
    pub fn keys(&self) -> Vec<String> {
        let prefix = self.prefix();
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(|s| s.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key in this scope. Other scopes are untouched.
    pub fn clear(&self) {
        let prefix = self.prefix();
        for key in self.store.keys() {
            if key.starts_with(&prefix) {
                self.store.delete(&key);
            }
        }
    }

    fn entries(&self) -> HashMap<String, Value> {
        let prefix = self.prefix();
        self.store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .filter_map(|k| {
                let value = self.store.get(&k)?;
                let bare = k.strip_prefix(&prefix)?.to_string();
                Some((bare, value))
            })
            .collect()
    }

    /// Captures the scope's current contents under a name.
    pub fn snapshot(&mut self, name: &str) {
        let entries = self.entries();
        debug!(
            "Snapshot '{}' of scope '{}' ({} keys)",
            name,
            self.scope,
            entries.len()
        );
        self.snapshots.insert(name.to_string(), entries);
    }

    /// Captures under [`DEFAULT_SNAPSHOT`].
    pub fn snapshot_default(&mut self) {
        self.snapshot(DEFAULT_SNAPSHOT);
    }

    /// Replaces the scope's contents with a named snapshot.
    ///
    /// Returns false, leaving the scope untouched, if no snapshot with
    /// that name exists.
    pub fn restore(&mut self, name: &str) -> bool {
        let Some(entries) = self.snapshots.get(name).cloned() else {
            debug!("No snapshot '{}' in scope '{}'", name, self.scope);
            return false;
        };
        self.clear();
        for (key, value) in entries {
            self.set(&key, value);
        }
        true
    }

    /// Restores [`DEFAULT_SNAPSHOT`].
    pub fn restore_default(&mut self) -> bool {
        self.restore(DEFAULT_SNAPSHOT)
    }

    /// Like [`restore`](Self::restore), but for snapshots that must
    /// exist: a missing name is an error instead of `false`.
    pub fn restore_required(&mut self, name: &str) -> Result<()> {
        if self.restore(name) {
            Ok(())
        } else {
            Err(Error::Snapshot(format!(
                "'{}' in scope '{}'",
                name, self.scope
            )))
        }
    }

    pub fn snapshot_names(&self) -> Vec<String> {
        self.snapshots.keys().cloned().collect()
    }

    pub fn drop_snapshot(&mut self, name: &str) -> bool {
        self.snapshots.remove(name).is_some()
    }
}
