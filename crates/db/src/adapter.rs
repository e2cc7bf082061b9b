//! The adapter trait and provider tags shared by every backend.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use testkit_core::{Error, Result};

/// Which backend an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Pure in-process map, no durable storage.
    Memory,
    /// SQLite database file owned by the adapter.
    EmbeddedFile,
    /// Connection handle supplied and owned by the host environment.
    RemoteManaged,
    /// ORM layer over an embedded-file connection.
    OrmEmbedded,
    /// ORM layer over a remote-managed connection.
    OrmRemote,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Memory => "memory",
            ProviderKind::EmbeddedFile => "embedded_file",
            ProviderKind::RemoteManaged => "remote_managed",
            ProviderKind::OrmEmbedded => "orm_embedded",
            ProviderKind::OrmRemote => "orm_remote",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(ProviderKind::Memory),
            "embedded_file" => Ok(ProviderKind::EmbeddedFile),
            "remote_managed" => Ok(ProviderKind::RemoteManaged),
            "orm_embedded" => Ok(ProviderKind::OrmEmbedded),
            "orm_remote" => Ok(ProviderKind::OrmRemote),
            other => Err(Error::Configuration(format!(
                "unknown database provider '{}'",
                other
            ))),
        }
    }
}

/// Uniform lifecycle and data surface over heterogeneous test databases.
///
/// Lifecycle: construct, `initialize`, use, `cleanup`/`reset` between
/// tests, `close` when done. Operations on an adapter that was never
/// initialized, or was closed, fail with a connection error rather
/// than panicking.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Establishes the backing handle. Idempotent while open.
    async fn initialize(&self) -> Result<()>;

    /// Deletes all rows from all user tables, preserving schema.
    ///
    /// Best-effort: a table that fails to clear is logged and skipped.
    async fn cleanup(&self) -> Result<()>;

    /// Returns the database to its initialize-time state.
    ///
    /// Equal to `cleanup` for every backend except memory, which
    /// restores the snapshot captured at `initialize`.
    async fn reset(&self) -> Result<()>;

    /// Whether the handle can currently serve queries. Never fails;
    /// a failed probe is reported as `false`.
    async fn is_ready(&self) -> bool;

    /// Releases the handle. Idempotent; a no-op when the handle is
    /// owned by the host environment.
    async fn close(&self) -> Result<()>;

    /// Upserts one row, keyed by `key`, into `table`.
    async fn put(&self, table: &str, key: &str, value: Value) -> Result<()>;

    /// Reads one row back, or `None` if the table or key is absent.
    async fn fetch(&self, table: &str, key: &str) -> Result<Option<Value>>;

    /// User tables currently present, sorted by name.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Rows in `table`, or 0 if the table is absent.
    async fn row_count(&self, table: &str) -> Result<u64>;
}
