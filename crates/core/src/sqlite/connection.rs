//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and implementing the executor
//! traits on top of the connection.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, rusqlite};

use super::statement::{SqliteStatement, collect_rows};
use crate::Error;
use crate::config::StoreConfig;
use crate::context::QueryContext;
use crate::executor::{Executor, PrepareExecutor};
use crate::row::{ExecResult, Rows, SingleRow, Value};

/// Statements the connection keeps compiled when no config is given.
const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 256;

/// SQLite executor.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the connection.
#[derive(Clone, Debug)]
pub struct SqliteExecutor {
    pub(crate) conn: Connection,
}

impl SqliteExecutor {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist and applies performance pragmas.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let location = path.as_ref().display().to_string();
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn, &location, DEFAULT_STATEMENT_CACHE_CAPACITY, None).await
    }

    /// Open the database described by `config`.
    pub async fn open_with_config(config: &StoreConfig) -> Result<Self, Error> {
        let conn = Connection::open(&config.db_path)
            .await
            .map_err(|e| Error::Database(e.into()))?;
        let location = config.db_path.display().to_string();
        Self::configure(conn, &location, config.statement_cache_capacity, Some(config.busy_timeout())).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn, ":memory:", DEFAULT_STATEMENT_CACHE_CAPACITY, None).await
    }

    async fn configure(
        conn: Connection, location: &str, statement_cache_capacity: usize, busy_timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        conn.call(move |conn| -> Result<(), Error> {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            if let Some(timeout) = busy_timeout {
                conn.busy_timeout(timeout)?;
            }
            conn.set_prepared_statement_cache_capacity(statement_cache_capacity);
            Ok(())
        })
        .await
        .map_err(Error::from)?;

        tracing::info!(path = location, statement_cache_capacity, "opened sqlite database");
        Ok(Self { conn })
    }

    /// Run `f` on the connection thread, bounded by the context deadline.
    ///
    /// On timeout the caller gets [`Error::Timeout`]; the closure may still
    /// finish on the connection thread.
    pub(crate) async fn run<T, F>(conn: &Connection, ctx: &QueryContext, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, Error> + Send + 'static,
    {
        let call = conn.call(f);
        let result = match ctx.timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => call.await,
        };
        result.map_err(Error::from)
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    async fn exec(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> Result<ExecResult, Error> {
        let query = query.to_string();
        let args = args.to_vec();
        Self::run(&self.conn, ctx, move |conn| {
            let mut stmt = conn.prepare(&query)?;
            let rows_affected = stmt.execute(rusqlite::params_from_iter(args.iter()))?;
            Ok(ExecResult { rows_affected: rows_affected as u64, last_insert_id: conn.last_insert_rowid() })
        })
        .await
    }

    async fn query(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> Result<Rows, Error> {
        let query = query.to_string();
        let args = args.to_vec();
        Self::run(&self.conn, ctx, move |conn| {
            let mut stmt = conn.prepare(&query)?;
            collect_rows(&mut stmt, &args, None)
        })
        .await
    }

    async fn query_row(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> SingleRow {
        let query = query.to_string();
        let args = args.to_vec();
        Self::run(&self.conn, ctx, move |conn| {
            let mut stmt = conn.prepare(&query)?;
            collect_rows(&mut stmt, &args, Some(1))
        })
        .await
        .map_or_else(SingleRow::from, SingleRow::first_of)
    }
}

#[async_trait]
impl PrepareExecutor for SqliteExecutor {
    type Statement = SqliteStatement;

    /// Compile `query` into the connection's statement cache.
    async fn prepare(&self, ctx: &QueryContext, query: &str) -> Result<SqliteStatement, Error> {
        let sql: Arc<str> = Arc::from(query);
        let compiled = sql.clone();
        Self::run(&self.conn, ctx, move |conn| {
            conn.prepare_cached(&compiled)?;
            Ok(())
        })
        .await?;

        Ok(SqliteStatement::new(self.conn.clone(), sql))
    }
}
