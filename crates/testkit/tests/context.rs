//! Lifecycle behavior of the test context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use testkit::{
    create_adapter, detect_best_provider, AdapterConfig, DatabaseAdapter,
    DatabaseCapabilities, EmbeddedFileAdapter, IsolationLevel, ProviderKind, RuntimeEnv,
    TestContext,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_end_test_clears_only_the_per_test_store() {
    init_tracing();
    let context = TestContext::new();

    context.store(IsolationLevel::PerTest).set("t", json!(1));
    context.store(IsolationLevel::PerSuite).set("s", json!(2));

    context.end_test().await;

    assert!(context.store(IsolationLevel::PerTest).is_empty());
    assert_eq!(context.store(IsolationLevel::PerSuite).get("s"), Some(json!(2)));

    context.end_suite().await;
    assert!(context.store(IsolationLevel::PerSuite).is_empty());
}

#[tokio::test]
async fn test_end_test_runs_handlers_before_clearing() {
    init_tracing();
    let context = TestContext::new();
    let store = context.store(IsolationLevel::PerTest);

    store.set("fixture", json!("present"));
    let observed = Arc::new(AtomicUsize::new(0));
    let counter = observed.clone();
    let probe = store.clone();
    store.on_cleanup(move || {
        let counter = counter.clone();
        let probe = probe.clone();
        async move {
            // Data is still visible while handlers run.
            if probe.has("fixture") {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    });

    context.end_test().await;

    assert_eq!(observed.load(Ordering::SeqCst), 1);
    assert!(context.store(IsolationLevel::PerTest).is_empty());
}

#[tokio::test]
async fn test_end_test_resets_attached_adapter() {
    init_tracing();
    let context = TestContext::new();

    let adapter = create_adapter(AdapterConfig::for_provider(ProviderKind::Memory)).unwrap();
    adapter.initialize().await.unwrap();
    context.attach_adapter(adapter.clone());

    adapter.put("users", "u1", json!({"name": "Ada"})).await.unwrap();
    context.end_test().await;

    // Baseline at initialize was empty, so the mutation is gone.
    assert_eq!(adapter.row_count("users").await.unwrap(), 0);
    assert!(adapter.is_ready().await);
}

#[tokio::test]
async fn test_end_test_cleans_attached_file_adapter() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = AdapterConfig::for_provider(ProviderKind::EmbeddedFile);
    config.path = Some(dir.path().join("ctx.db").to_string_lossy().to_string());
    let adapter = create_adapter(config).unwrap();
    adapter.initialize().await.unwrap();

    let context = TestContext::new();
    context.attach_adapter(adapter.clone());
    adapter.put("sessions", "s1", json!({"alive": true})).await.unwrap();

    context.end_test().await;

    // For file backends reset equals cleanup: rows gone, schema kept.
    assert_eq!(adapter.row_count("sessions").await.unwrap(), 0);
    assert_eq!(
        adapter.table_names().await.unwrap(),
        vec!["sessions".to_string()]
    );
}

#[tokio::test]
async fn test_adapter_reset_failure_does_not_escape_teardown() {
    init_tracing();
    let context = TestContext::new();

    // Never initialized, so reset will fail with a connection error.
    let broken: Arc<dyn DatabaseAdapter> =
        Arc::new(EmbeddedFileAdapter::new("/nonexistent/broken.db"));
    context.attach_adapter(broken);
    context.store(IsolationLevel::PerTest).set("k", json!(1));

    context.end_test().await;

    assert!(context.store(IsolationLevel::PerTest).is_empty());
}

#[tokio::test]
async fn test_detach_stops_lifecycle_management() {
    let context = TestContext::new();
    let adapter = create_adapter(AdapterConfig::for_provider(ProviderKind::Memory)).unwrap();
    adapter.initialize().await.unwrap();
    context.attach_adapter(adapter.clone());

    let detached = context.detach_adapter().unwrap();
    detached.put("users", "u1", json!(1)).await.unwrap();
    assert!(context.adapter().is_none());

    context.end_test().await;
    // No longer attached, so end_test leaves it alone.
    assert_eq!(adapter.row_count("users").await.unwrap(), 1);
}

#[tokio::test]
async fn test_seeded_contexts_generate_identical_data() {
    let a = TestContext::with_seed(42);
    let b = TestContext::with_seed(42);

    let user_a = a.factory().lock().user();
    let user_b = b.factory().lock().user();
    assert_eq!(user_a, user_b);

    // The factory handle is shared, so a second handle continues the
    // same sequence rather than restarting it.
    let next = a.factory();
    assert_ne!(next.lock().user(), user_a);
}

#[tokio::test]
async fn test_scoped_views_through_the_context() {
    let context = TestContext::new();
    let auth = context.scoped(IsolationLevel::PerTest, "auth");
    let cart = context.scoped(IsolationLevel::PerTest, "cart");

    auth.set("token", json!("abc"));
    cart.set("items", json!([1, 2]));
    auth.clear();

    assert!(auth.get("token").is_none());
    assert_eq!(cart.get("items"), Some(json!([1, 2])));
}

#[tokio::test]
async fn test_capability_descriptor_drives_provider_choice() {
    let runtime = RuntimeEnv::with_capabilities(DatabaseCapabilities::none());
    let context = TestContext::with_runtime(runtime);

    let provider = detect_best_provider(&context.runtime().database);
    assert_eq!(provider, ProviderKind::Memory);

    let adapter = create_adapter(AdapterConfig::for_provider(provider)).unwrap();
    adapter.initialize().await.unwrap();
    assert!(adapter.is_ready().await);
}
