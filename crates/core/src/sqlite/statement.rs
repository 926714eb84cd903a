//! Prepared statements on a SQLite connection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, rusqlite};

use super::connection::SqliteExecutor;
use crate::Error;
use crate::context::QueryContext;
use crate::executor::PreparedStatement;
use crate::row::{ExecResult, Rows, SingleRow, Value};

/// A statement compiled into the connection's statement cache.
///
/// rusqlite statements borrow their connection, so the compiled statement
/// stays owned by the connection thread and this handle refers to it by its
/// query text. Executing the handle reuses the compiled statement; if the
/// connection evicted it meanwhile it is compiled again transparently.
#[derive(Clone, Debug)]
pub struct SqliteStatement {
    conn: Connection,
    sql: Arc<str>,
}

impl SqliteStatement {
    pub(crate) fn new(conn: Connection, sql: Arc<str>) -> Self {
        Self { conn, sql }
    }
}

#[async_trait]
impl PreparedStatement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn exec(&self, ctx: &QueryContext, args: &[Value]) -> Result<ExecResult, Error> {
        let sql = self.sql.clone();
        let args = args.to_vec();
        SqliteExecutor::run(&self.conn, ctx, move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows_affected = stmt.execute(rusqlite::params_from_iter(args.iter()))?;
            Ok(ExecResult { rows_affected: rows_affected as u64, last_insert_id: conn.last_insert_rowid() })
        })
        .await
    }

    async fn query(&self, ctx: &QueryContext, args: &[Value]) -> Result<Rows, Error> {
        let sql = self.sql.clone();
        let args = args.to_vec();
        SqliteExecutor::run(&self.conn, ctx, move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            collect_rows(&mut stmt, &args, None)
        })
        .await
    }

    async fn query_row(&self, ctx: &QueryContext, args: &[Value]) -> SingleRow {
        let sql = self.sql.clone();
        let args = args.to_vec();
        SqliteExecutor::run(&self.conn, ctx, move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            collect_rows(&mut stmt, &args, Some(1))
        })
        .await
        .map_or_else(SingleRow::from, SingleRow::first_of)
    }

    /// Finalize the compiled statement by discarding it from the
    /// connection's statement cache.
    async fn close(&self) -> Result<(), Error> {
        let sql = self.sql.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.prepare_cached(&sql)?.discard();
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

/// Bind `args`, run `stmt` and materialize up to `limit` rows.
pub(crate) fn collect_rows(
    stmt: &mut rusqlite::Statement<'_>, args: &[Value], limit: Option<usize>,
) -> Result<Rows, Error> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let record = (0..width)
            .map(|idx| row.get::<_, Value>(idx))
            .collect::<Result<Vec<_>, _>>()?;
        values.push(record);

        if limit.is_some_and(|max| values.len() >= max) {
            break;
        }
    }

    Ok(Rows::new(columns, values))
}
