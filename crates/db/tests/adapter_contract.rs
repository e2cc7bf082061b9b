//! Lifecycle contract tests against a real SQLite file.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use testkit_db::{
    create_adapter, AdapterConfig, DatabaseAdapter, EmbeddedFileAdapter, OrmAdapter,
    ProviderKind,
};

fn file_adapter(dir: &TempDir) -> EmbeddedFileAdapter {
    let path = dir.path().join("contract.db");
    EmbeddedFileAdapter::new(path.to_string_lossy().to_string())
}

#[tokio::test]
async fn test_embedded_file_full_lifecycle() {
    let dir = TempDir::new().unwrap();
    let adapter = file_adapter(&dir);

    adapter.initialize().await.unwrap();
    assert!(adapter.is_ready().await);

    adapter.put("users", "u1", json!({"name": "Ada"})).await.unwrap();
    adapter.put("users", "u2", json!({"name": "Grace"})).await.unwrap();
    assert_eq!(adapter.row_count("users").await.unwrap(), 2);
    assert_eq!(
        adapter.fetch("users", "u1").await.unwrap(),
        Some(json!({"name": "Ada"}))
    );

    adapter.cleanup().await.unwrap();
    assert_eq!(adapter.row_count("users").await.unwrap(), 0);
    // Schema survives the cleanup.
    assert_eq!(adapter.table_names().await.unwrap(), vec!["users".to_string()]);

    adapter.close().await.unwrap();
    assert!(!adapter.is_ready().await);
    assert!(adapter.fetch("users", "u1").await.is_err());
    adapter.close().await.unwrap();
}

#[tokio::test]
async fn test_cleanup_handles_foreign_keys_in_any_order() {
    let dir = TempDir::new().unwrap();
    let adapter = file_adapter(&dir);
    adapter.initialize().await.unwrap();

    adapter
        .execute_batch(
            "CREATE TABLE authors (id TEXT PRIMARY KEY);
             CREATE TABLE books (
                 id TEXT PRIMARY KEY,
                 author_id TEXT NOT NULL REFERENCES authors(id)
             );
             INSERT INTO authors VALUES ('a1');
             INSERT INTO books VALUES ('b1', 'a1');",
        )
        .unwrap();

    // 'authors' sorts before 'books', so row deletion runs parent-first;
    // this only works because foreign keys are off during cleanup.
    adapter.cleanup().await.unwrap();

    assert_eq!(adapter.row_count("authors").await.unwrap(), 0);
    assert_eq!(adapter.row_count("books").await.unwrap(), 0);
    let mut tables = adapter.table_names().await.unwrap();
    tables.sort();
    assert_eq!(tables, vec!["authors".to_string(), "books".to_string()]);
}

#[tokio::test]
async fn test_bookkeeping_tables_survive_cleanup() {
    let dir = TempDir::new().unwrap();
    let adapter = file_adapter(&dir);
    adapter.initialize().await.unwrap();

    adapter
        .execute_batch(
            "CREATE TABLE _migrations (id TEXT PRIMARY KEY);
             INSERT INTO _migrations VALUES ('0001');
             CREATE TABLE posts (id TEXT PRIMARY KEY);
             INSERT INTO posts VALUES ('p1');",
        )
        .unwrap();

    adapter.cleanup().await.unwrap();

    assert_eq!(adapter.row_count("posts").await.unwrap(), 0);
    assert_eq!(adapter.row_count("_migrations").await.unwrap(), 1);
    assert_eq!(adapter.table_names().await.unwrap(), vec!["posts".to_string()]);
}

#[tokio::test]
async fn test_reset_equals_cleanup_for_file_backend() {
    let dir = TempDir::new().unwrap();
    let adapter = file_adapter(&dir);
    adapter.initialize().await.unwrap();

    adapter.put("events", "e1", json!({"kind": "seed"})).await.unwrap();
    adapter.reset().await.unwrap();

    // Unlike the memory backend, reset does not bring seed rows back.
    assert_eq!(adapter.row_count("events").await.unwrap(), 0);
}

#[tokio::test]
async fn test_data_survives_reopen_through_new_adapter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("durable.db").to_string_lossy().to_string();

    let first = EmbeddedFileAdapter::new(path.clone());
    first.initialize().await.unwrap();
    first.put("settings", "s1", json!({"on": true})).await.unwrap();
    first.close().await.unwrap();

    let second = EmbeddedFileAdapter::new(path);
    second.initialize().await.unwrap();
    assert_eq!(
        second.fetch("settings", "s1").await.unwrap(),
        Some(json!({"on": true}))
    );
}

#[tokio::test]
async fn test_orm_wrapped_file_adapter_delegates_cleanup() {
    let dir = TempDir::new().unwrap();
    let inner: Arc<dyn DatabaseAdapter> = Arc::new(file_adapter(&dir));
    let orm = OrmAdapter::new(inner.clone()).unwrap();
    assert_eq!(orm.provider(), ProviderKind::OrmEmbedded);

    orm.initialize().await.unwrap();
    orm.put("carts", "c1", json!({"items": 2})).await.unwrap();
    orm.cleanup().await.unwrap();

    assert_eq!(inner.row_count("carts").await.unwrap(), 0);
    assert!(inner.is_ready().await);
}

#[tokio::test]
async fn test_factory_builds_working_file_adapter() {
    let dir = TempDir::new().unwrap();
    let mut config = AdapterConfig::for_provider(ProviderKind::EmbeddedFile);
    config.path = Some(dir.path().join("factory.db").to_string_lossy().to_string());

    let adapter = create_adapter(config).unwrap();
    adapter.initialize().await.unwrap();
    adapter.put("widgets", "w1", json!(1)).await.unwrap();
    assert_eq!(adapter.row_count("widgets").await.unwrap(), 1);
}
