//! The HTTP test client: sessions, retries, timeouts and history.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use testkit_core::{Error, Result};

use crate::dispatch::{Dispatch, RemoteDispatch, RouterDispatch, TestRequest, TestResponse};
use crate::jar::CookieJar;

/// First retry delay; doubles on each subsequent attempt.
pub const BACKOFF_BASE_MS: u64 = 100;

/// Session key used when a client is not forked into a named session.
pub const DEFAULT_SESSION: &str = "default";

/// Per-client defaults, applied to every request unless overridden.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub default_headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub retries: u32,
    pub session_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_headers: Vec::new(),
            timeout: Duration::from_secs(30),
            retries: 0,
            session_key: DEFAULT_SESSION.to_string(),
        }
    }
}

/// Per-request options; `None` fields fall back to the client config.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Acceptable status codes; anything else is a mismatch failure.
    pub expected_status: Option<Vec<u16>>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    /// Session key override for this one request.
    pub session: Option<String>,
}

/// One completed request/response pair.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub request: TestRequest,
    pub response: TestResponse,
    pub timestamp: i64,
}

/// HTTP client for tests.
///
/// Cookies are tracked per session key and replayed automatically;
/// transport failures retry with exponential backoff; every completed
/// exchange lands in an append-only history. Clones and session forks
/// share the jar and the history.
#[derive(Clone)]
pub struct HttpTestClient {
    dispatch: Arc<dyn Dispatch>,
    config: ClientConfig,
    jar: Arc<Mutex<CookieJar>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl HttpTestClient {
    pub fn new(dispatch: Arc<dyn Dispatch>) -> Self {
        Self::with_config(dispatch, ClientConfig::default())
    }

    pub fn with_config(dispatch: Arc<dyn Dispatch>, config: ClientConfig) -> Self {
        Self {
            dispatch,
            config,
            jar: Arc::new(Mutex::new(CookieJar::new())),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Client dispatching in-process into an axum router.
    pub fn for_router(router: axum::Router) -> Self {
        Self::new(Arc::new(RouterDispatch::new(router)))
    }

    /// Client dispatching over the wire to a listening server.
    pub fn for_remote(base_url: &str) -> Self {
        Self::new(Arc::new(RemoteDispatch::new(base_url)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_key(&self) -> &str {
        &self.config.session_key
    }

    /// Forks a client onto its own session key.
    ///
    /// The fork shares the dispatch target, defaults, cookie jar and
    /// history; only the session key differs, so its cookies live in
    /// their own namespace. Without an explicit key a fresh one is
    /// generated.
    pub fn session(&self, key: Option<&str>) -> Self {
        let mut config = self.config.clone();
        config.session_key = match key {
            Some(key) => key.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        Self {
            dispatch: self.dispatch.clone(),
            config,
            jar: self.jar.clone(),
            history: self.history.clone(),
        }
    }

    /// The cookie currently stored for this client's session.
    pub fn cookie(&self) -> Option<String> {
        self.jar
            .lock()
            .get(&self.config.session_key)
            .map(|s| s.to_string())
    }

    /// Pre-seeds the cookie for this client's session.
    pub fn set_cookie(&self, cookie: &str) {
        self.jar.lock().set(&self.config.session_key, cookie);
    }

    pub fn clear_cookies(&self) {
        self.jar.lock().clear();
    }

    /// Snapshot of the request history, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        }
    }

    /// Defaults first, then per-request headers (which win on a name
    /// clash), then the session cookie unless an explicit cookie
    /// header was given.
    fn assemble_headers(&self, options: &RequestOptions, session: &str) -> Vec<(String, String)> {
        let mut headers = self.config.default_headers.clone();
        for (name, value) in &options.headers {
            headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        let has_cookie = headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("cookie"));
        if !has_cookie {
            if let Some(cookie) = self.jar.lock().get(session) {
                headers.push(("cookie".to_string(), cookie.to_string()));
            }
        }
        headers
    }

    /// Issues one request, retrying transport failures with backoff.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<TestResponse> {
        let session = options
            .session
            .clone()
            .unwrap_or_else(|| self.config.session_key.clone());
        let request = TestRequest {
            method: options.method.clone().unwrap_or_else(|| "GET".to_string()),
            path: self.resolve(path),
            headers: self.assemble_headers(&options, &session),
            body: options.body.clone(),
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let retries = options.retries.unwrap_or(self.config.retries);
        let expected = options.expected_status.as_deref();

        let mut attempt: u32 = 0;
        loop {
            match self.attempt(request.clone(), timeout, &session, expected).await {
                Ok(response) => return Ok(response),
                // Assertion-style failures surface immediately.
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= retries {
                        return Err(e);
                    }
                    let delay = Duration::from_millis(BACKOFF_BASE_MS << attempt.min(10));
                    warn!(
                        "{} {} failed (attempt {}/{}): {}; retrying in {:?}",
                        request.method,
                        request.path,
                        attempt + 1,
                        retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: TestRequest,
        timeout: Duration,
        session: &str,
        expected: Option<&[u16]>,
    ) -> Result<TestResponse> {
        // A dispatch that loses the race is dropped here, so a late
        // response can never reach the jar or the history.
        let response =
            match tokio::time::timeout(timeout, self.dispatch.dispatch(request.clone())).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(Error::Timeout {
                        elapsed_ms: timeout.as_millis() as u64,
                    })
                }
            };

        if let Some(cookie) = response.header("set-cookie") {
            debug!("Storing cookie for session '{}'", session);
            self.jar.lock().set(session, cookie);
        }
        self.history.lock().push(HistoryEntry {
            request,
            response: response.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });

        if let Some(expected) = expected {
            if !expected.contains(&response.status) {
                return Err(Error::StatusMismatch {
                    status: response.status,
                    expected: expected.to_vec(),
                    body: response.body,
                });
            }
        }
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.get_with(path, RequestOptions::default()).await
    }

    pub async fn get_with(&self, path: &str, options: RequestOptions) -> Result<TestResponse> {
        self.request(path, with_method(options, "GET")).await
    }

    pub async fn post(&self, path: &str, body: Option<String>) -> Result<TestResponse> {
        self.post_with(
            path,
            RequestOptions {
                body,
                ..RequestOptions::default()
            },
        )
        .await
    }

    pub async fn post_with(&self, path: &str, options: RequestOptions) -> Result<TestResponse> {
        self.request(path, with_method(options, "POST")).await
    }

    /// POST with a serialized JSON body and matching content type.
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<TestResponse> {
        self.request(path, json_options("POST", body)?).await
    }

    pub async fn put(&self, path: &str, body: Option<String>) -> Result<TestResponse> {
        self.request(
            path,
            RequestOptions {
                method: Some("PUT".to_string()),
                body,
                ..RequestOptions::default()
            },
        )
        .await
    }

    pub async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> Result<TestResponse> {
        self.request(path, json_options("PUT", body)?).await
    }

    pub async fn patch(&self, path: &str, body: Option<String>) -> Result<TestResponse> {
        self.request(
            path,
            RequestOptions {
                method: Some("PATCH".to_string()),
                body,
                ..RequestOptions::default()
            },
        )
        .await
    }

    pub async fn patch_json<T: Serialize>(&self, path: &str, body: &T) -> Result<TestResponse> {
        self.request(path, json_options("PATCH", body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<TestResponse> {
        self.delete_with(path, RequestOptions::default()).await
    }

    pub async fn delete_with(&self, path: &str, options: RequestOptions) -> Result<TestResponse> {
        self.request(path, with_method(options, "DELETE")).await
    }
}

fn with_method(mut options: RequestOptions, method: &str) -> RequestOptions {
    options.method = Some(method.to_string());
    options
}

fn json_options<T: Serialize>(method: &str, body: &T) -> Result<RequestOptions> {
    Ok(RequestOptions {
        method: Some(method.to_string()),
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Some(serde_json::to_string(body)?),
        ..RequestOptions::default()
    })
}
