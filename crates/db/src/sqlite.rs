//! SQLite-backed adapters: an owned database file and a host-managed handle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info, warn};

use testkit_core::{Error, Result};

use crate::adapter::{DatabaseAdapter, ProviderKind};

/// Shared SQLite connection handle, as handed out by a host harness.
pub type SqliteHandle = Arc<Mutex<Connection>>;

const OPEN_PRAGMAS: &str =
    "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;";

/// User tables only: skips SQLite's own bookkeeping and any
/// underscore-prefixed framework tables.
const USER_TABLES_SQL: &str = "SELECT name FROM sqlite_master WHERE type = 'table' \
     AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
     AND name NOT LIKE '\\_%' ESCAPE '\\' \
     ORDER BY name";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn probe(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok()
}

fn list_user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(USER_TABLES_SQL)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Deletes all rows from every user table, skipping tables that fail.
///
/// Foreign keys are disabled for the duration so tables can be cleared
/// in any order, then re-enabled before returning.
fn wipe_user_tables(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", false)?;
    let outcome = clear_each_table(conn);
    let restored = conn.pragma_update(None, "foreign_keys", true);
    outcome?;
    restored?;
    Ok(())
}

fn clear_each_table(conn: &Connection) -> Result<()> {
    for table in list_user_tables(conn)? {
        let sql = format!("DELETE FROM {}", quote_ident(&table));
        match conn.execute(&sql, []) {
            Ok(rows) => debug!("Cleared {} row(s) from {}", rows, table),
            Err(e) => warn!("Failed to clear table {}: {}", table, e),
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn put_row(conn: &Connection, table: &str, key: &str, value: &Value) -> Result<()> {
    let ident = quote_ident(table);
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            ident
        ),
        [],
    )?;
    conn.execute(
        &format!("INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)", ident),
        params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}

fn fetch_row(conn: &Connection, table: &str, key: &str) -> Result<Option<Value>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }
    let text: Option<String> = conn
        .query_row(
            &format!("SELECT value FROM {} WHERE key = ?1", quote_ident(table)),
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    match text {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    if !table_exists(conn, table)? {
        return Ok(0);
    }
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

enum FileState {
    New,
    Open(Connection),
    Closed,
}

/// Adapter that owns a SQLite database file.
///
/// `initialize` opens the file with WAL journaling and foreign-key
/// enforcement; `close` drops the connection permanently.
pub struct EmbeddedFileAdapter {
    path: String,
    state: Mutex<FileState>,
}

impl EmbeddedFileAdapter {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(FileState::New),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Runs raw SQL against the open database, for schema setup.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(sql)?;
            Ok(())
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let state = self.state.lock();
        match &*state {
            FileState::Open(conn) => f(conn),
            FileState::New => Err(Error::Connection(format!(
                "embedded database {} is not initialized",
                self.path
            ))),
            FileState::Closed => Err(Error::Connection(format!(
                "embedded database {} has been closed",
                self.path
            ))),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for EmbeddedFileAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::EmbeddedFile
    }

    async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock();
        match &*state {
            FileState::Open(_) => Ok(()),
            FileState::Closed => Err(Error::Connection(format!(
                "embedded database {} has been closed",
                self.path
            ))),
            FileState::New => {
                let conn = Connection::open(&self.path).map_err(|e| {
                    Error::Connection(format!("failed to open {}: {}", self.path, e))
                })?;
                conn.execute_batch(OPEN_PRAGMAS)?;
                info!("Opened embedded database at {}", self.path);
                *state = FileState::Open(conn);
                Ok(())
            }
        }
    }

    async fn cleanup(&self) -> Result<()> {
        debug!("Cleaning embedded database {}", self.path);
        self.with_conn(wipe_user_tables)
    }

    async fn reset(&self) -> Result<()> {
        self.cleanup().await
    }

    async fn is_ready(&self) -> bool {
        let state = self.state.lock();
        match &*state {
            FileState::Open(conn) => probe(conn),
            _ => false,
        }
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if matches!(&*state, FileState::Open(_)) {
            debug!("Closing embedded database {}", self.path);
        }
        *state = FileState::Closed;
        Ok(())
    }

    async fn put(&self, table: &str, key: &str, value: Value) -> Result<()> {
        self.with_conn(|conn| put_row(conn, table, key, &value))
    }

    async fn fetch(&self, table: &str, key: &str) -> Result<Option<Value>> {
        self.with_conn(|conn| fetch_row(conn, table, key))
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(list_user_tables)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        self.with_conn(|conn| count_rows(conn, table))
    }
}

/// Adapter over a connection handle owned by the host environment.
///
/// The handle is borrowed: `close` never releases it, and the host may
/// keep using it after this adapter is done.
pub struct RemoteManagedAdapter {
    url: Option<String>,
    handle: SqliteHandle,
    initialized: Mutex<bool>,
}

impl RemoteManagedAdapter {
    pub fn new(handle: SqliteHandle) -> Self {
        Self {
            url: None,
            handle,
            initialized: Mutex::new(false),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn describe(&self) -> &str {
        self.url.as_deref().unwrap_or("managed database")
    }

    fn ensure_initialized(&self) -> Result<()> {
        if *self.initialized.lock() {
            Ok(())
        } else {
            Err(Error::Connection(format!(
                "{} is not initialized",
                self.describe()
            )))
        }
    }
}

#[async_trait]
impl DatabaseAdapter for RemoteManagedAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::RemoteManaged
    }

    async fn initialize(&self) -> Result<()> {
        let ok = probe(&self.handle.lock());
        if !ok {
            return Err(Error::Connection(format!(
                "{} did not answer the readiness probe",
                self.describe()
            )));
        }
        *self.initialized.lock() = true;
        debug!("Verified {}", self.describe());
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        self.ensure_initialized()?;
        debug!("Cleaning {}", self.describe());
        wipe_user_tables(&self.handle.lock())
    }

    async fn reset(&self) -> Result<()> {
        self.cleanup().await
    }

    async fn is_ready(&self) -> bool {
        probe(&self.handle.lock())
    }

    async fn close(&self) -> Result<()> {
        // The host owns this connection's lifecycle.
        debug!("Leaving {} open", self.describe());
        Ok(())
    }

    async fn put(&self, table: &str, key: &str, value: Value) -> Result<()> {
        self.ensure_initialized()?;
        put_row(&self.handle.lock(), table, key, &value)
    }

    async fn fetch(&self, table: &str, key: &str) -> Result<Option<Value>> {
        self.ensure_initialized()?;
        fetch_row(&self.handle.lock(), table, key)
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.ensure_initialized()?;
        list_user_tables(&self.handle.lock())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        self.ensure_initialized()?;
        count_rows(&self.handle.lock(), table)
    }
}
