//! Dispatch strategies: in-process into a router, over the wire, or
//! an ordered fallback chain.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use serde::de::DeserializeOwned;
use tower::ServiceExt;
use tracing::debug;

use testkit_core::{Error, Result};

/// A request as the client hands it to a dispatcher.
#[derive(Debug, Clone)]
pub struct TestRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A response with its body already read.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TestResponse {
    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers a request to the application under test.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: TestRequest) -> Result<TestResponse>;
}

/// In-process dispatch straight into an axum router, no sockets.
pub struct RouterDispatch {
    router: Router,
}

impl RouterDispatch {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Dispatch for RouterDispatch {
    async fn dispatch(&self, request: TestRequest) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(&request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = match request.body {
            Some(body) => Body::from(body),
            None => Body::empty(),
        };
        let req = builder
            .body(body)
            .map_err(|e| Error::Dispatch(format!("invalid request: {}", e)))?;

        let response = match self.router.clone().oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let (parts, body) = response.into_parts();
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| Error::Dispatch(format!("failed to read body: {}", e)))?;

        Ok(TestResponse {
            status: parts.status.as_u16(),
            headers,
            body: String::from_utf8_lossy(&bytes).to_string(),
        })
    }
}

/// Over-the-wire dispatch against a listening server.
pub struct RemoteDispatch {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteDispatch {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }
}

#[async_trait]
impl Dispatch for RemoteDispatch {
    async fn dispatch(&self, request: TestRequest) -> Result<TestResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::Dispatch(format!("invalid method: {}", e)))?;
        let mut builder = self.client.request(method, self.url_for(&request.path));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(TestResponse { status, headers, body })
    }
}

/// Tries strategies in order; the first that succeeds wins.
pub struct FallbackDispatch {
    strategies: Vec<Arc<dyn Dispatch>>,
}

impl FallbackDispatch {
    pub fn new(strategies: Vec<Arc<dyn Dispatch>>) -> Self {
        Self { strategies }
    }
}

#[async_trait]
impl Dispatch for FallbackDispatch {
    async fn dispatch(&self, request: TestRequest) -> Result<TestResponse> {
        let mut last_err = None;
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.dispatch(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!("Dispatch strategy {} failed: {}", index, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| Error::Dispatch("no dispatch strategies configured".to_string())))
    }
}
