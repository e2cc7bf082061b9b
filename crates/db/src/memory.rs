//! In-process map-backed adapter with snapshot reset semantics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use testkit_core::{Error, Result};

use crate::adapter::{DatabaseAdapter, ProviderKind};

/// `table -> key -> row` layout used by the memory backend.
pub type MemoryTables = HashMap<String, HashMap<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    New,
    Open,
    Closed,
}

struct MemoryState {
    live: MemoryTables,
    baseline: MemoryTables,
    phase: Phase,
}

/// Adapter over plain in-process maps.
///
/// `initialize` captures a baseline snapshot of whatever data the
/// adapter was constructed with; `reset` restores that baseline, while
/// `cleanup` empties the live data entirely.
#[derive(Clone)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::with_tables(MemoryTables::new())
    }

    /// Starts with seed data that `initialize` will snapshot.
    pub fn with_tables(tables: MemoryTables) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                live: tables,
                baseline: MemoryTables::new(),
                phase: Phase::New,
            })),
        }
    }

    fn ensure_open(state: &MemoryState) -> Result<()> {
        match state.phase {
            Phase::Open => Ok(()),
            Phase::New => Err(Error::Connection(
                "memory database is not initialized".to_string(),
            )),
            Phase::Closed => Err(Error::Connection(
                "memory database has been closed".to_string(),
            )),
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseAdapter for MemoryAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Memory
    }

    async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Open => Ok(()),
            Phase::Closed => Err(Error::Connection(
                "memory database has been closed".to_string(),
            )),
            Phase::New => {
                state.baseline = state.live.clone();
                state.phase = Phase::Open;
                debug!(
                    "Initialized memory database with {} seed table(s)",
                    state.baseline.len()
                );
                Ok(())
            }
        }
    }

    async fn cleanup(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        state.live.clear();
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        state.live = state.baseline.clone();
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.state.lock().phase == Phase::Open
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase != Phase::Closed {
            state.live.clear();
            state.baseline.clear();
            state.phase = Phase::Closed;
        }
        Ok(())
    }

    async fn put(&self, table: &str, key: &str, value: Value) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        state
            .live
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn fetch(&self, table: &str, key: &str) -> Result<Option<Value>> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(state.live.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        let mut names: Vec<String> = state.live.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(state.live.get(table).map(|t| t.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> MemoryAdapter {
        let mut tables = MemoryTables::new();
        let mut users = HashMap::new();
        users.insert("u1".to_string(), json!({"name": "Ada"}));
        tables.insert("users".to_string(), users);
        MemoryAdapter::with_tables(tables)
    }

    #[tokio::test]
    async fn test_reset_restores_initialize_time_state() {
        let adapter = seeded();
        adapter.initialize().await.unwrap();

        adapter
            .put("users", "u2", json!({"name": "Grace"}))
            .await
            .unwrap();
        adapter.put("orders", "o1", json!({"total": 5})).await.unwrap();
        assert_eq!(adapter.row_count("users").await.unwrap(), 2);

        adapter.reset().await.unwrap();

        assert_eq!(adapter.row_count("users").await.unwrap(), 1);
        assert_eq!(
            adapter.fetch("users", "u1").await.unwrap(),
            Some(json!({"name": "Ada"}))
        );
        assert_eq!(adapter.row_count("orders").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_empties_everything() {
        let adapter = seeded();
        adapter.initialize().await.unwrap();
        adapter.cleanup().await.unwrap();
        assert!(adapter.table_names().await.unwrap().is_empty());

        // The baseline is untouched, so reset still recovers the seed.
        adapter.reset().await.unwrap();
        assert_eq!(adapter.row_count("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let adapter = MemoryAdapter::new();
        assert!(!adapter.is_ready().await);
        let err = adapter.fetch("users", "u1").await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let adapter = seeded();
        adapter.initialize().await.unwrap();
        adapter.close().await.unwrap();
        adapter.close().await.unwrap();

        assert!(!adapter.is_ready().await);
        assert!(adapter.put("users", "u9", json!({})).await.is_err());
        assert!(adapter.initialize().await.is_err());
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent_while_open() {
        let adapter = seeded();
        adapter.initialize().await.unwrap();
        adapter.put("users", "u2", json!({})).await.unwrap();

        // A second initialize must not re-capture the baseline.
        adapter.initialize().await.unwrap();
        adapter.reset().await.unwrap();
        assert_eq!(adapter.row_count("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let adapter = seeded();
        adapter.initialize().await.unwrap();
        let other = adapter.clone();
        other.put("users", "u2", json!({})).await.unwrap();
        assert_eq!(adapter.row_count("users").await.unwrap(), 2);
    }
}
