//! HTTP test client with cookie-jar sessions, retries and timeouts.

pub mod client;
pub mod dispatch;
pub mod jar;
pub mod outbox;

pub use client::{
    ClientConfig, HistoryEntry, HttpTestClient, RequestOptions, BACKOFF_BASE_MS, DEFAULT_SESSION,
};
pub use dispatch::{
    Dispatch, FallbackDispatch, RemoteDispatch, RouterDispatch, TestRequest, TestResponse,
};
pub use jar::CookieJar;
pub use outbox::{EmailRecord, Outbox, OUTBOX_CLEAR_PATH, OUTBOX_PATH};
