//! Mock executor for exercising code that wraps a [`PrepareExecutor`].
//!
//! Every call is counted. Behavior of each uncached operation and of
//! `prepare` can be replaced with a closure; statements handed out by
//! `prepare` record their own calls in the same [`MockCalls`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::context::QueryContext;
use crate::executor::{Executor, PrepareExecutor, PreparedStatement};
use crate::row::{ExecResult, Rows, SingleRow, Value};
use crate::Error;

type PrepareFn = Box<dyn Fn(&str) -> Result<(), Error> + Send + Sync>;
type ExecFn = Box<dyn Fn(&str, &[Value]) -> Result<ExecResult, Error> + Send + Sync>;
type QueryFn = Box<dyn Fn(&str, &[Value]) -> Result<Rows, Error> + Send + Sync>;
type QueryRowFn = Box<dyn Fn(&str, &[Value]) -> SingleRow + Send + Sync>;

/// Call counters shared by a [`MockExecutor`] and its statements.
#[derive(Debug, Default)]
pub struct MockCalls {
    pub prepare: AtomicUsize,
    pub prepared: AtomicUsize,
    pub exec: AtomicUsize,
    pub query: AtomicUsize,
    pub query_row: AtomicUsize,
    pub stmt_exec: AtomicUsize,
    pub stmt_query: AtomicUsize,
    pub stmt_query_row: AtomicUsize,
    pub stmt_close: AtomicUsize,
}

impl MockCalls {
    pub fn prepares(&self) -> usize {
        self.prepare.load(Ordering::SeqCst)
    }

    /// Prepares that handed out a statement.
    pub fn successful_prepares(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    /// Calls that went through the uncached path.
    pub fn uncached(&self) -> usize {
        self.exec.load(Ordering::SeqCst) + self.query.load(Ordering::SeqCst) + self.query_row.load(Ordering::SeqCst)
    }

    /// Calls that went through a prepared statement.
    pub fn cached(&self) -> usize {
        self.stmt_exec.load(Ordering::SeqCst)
            + self.stmt_query.load(Ordering::SeqCst)
            + self.stmt_query_row.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stmt_close.load(Ordering::SeqCst)
    }
}

/// Configurable [`PrepareExecutor`] for tests.
pub struct MockExecutor {
    calls: Arc<MockCalls>,
    prepare_fn: PrepareFn,
    prepare_delay: Option<Duration>,
    exec_fn: ExecFn,
    query_fn: QueryFn,
    query_row_fn: QueryRowFn,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Mock whose prepares succeed and whose calls return empty results.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(MockCalls::default()),
            prepare_fn: Box::new(|_| Ok(())),
            prepare_delay: None,
            exec_fn: Box::new(|_, _| Ok(ExecResult::default())),
            query_fn: Box::new(|_, _| Ok(Rows::empty())),
            query_row_fn: Box::new(|_, _| SingleRow::no_rows()),
        }
    }

    pub fn with_prepare(mut self, f: impl Fn(&str) -> Result<(), Error> + Send + Sync + 'static) -> Self {
        self.prepare_fn = Box::new(f);
        self
    }

    /// Make every prepare take `delay` before it succeeds or fails.
    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = Some(delay);
        self
    }

    pub fn with_exec(
        mut self, f: impl Fn(&str, &[Value]) -> Result<ExecResult, Error> + Send + Sync + 'static,
    ) -> Self {
        self.exec_fn = Box::new(f);
        self
    }

    pub fn with_query(mut self, f: impl Fn(&str, &[Value]) -> Result<Rows, Error> + Send + Sync + 'static) -> Self {
        self.query_fn = Box::new(f);
        self
    }

    pub fn with_query_row(mut self, f: impl Fn(&str, &[Value]) -> SingleRow + Send + Sync + 'static) -> Self {
        self.query_row_fn = Box::new(f);
        self
    }

    /// Counters, shared with every statement this mock prepares.
    pub fn calls(&self) -> Arc<MockCalls> {
        self.calls.clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn exec(&self, _ctx: &QueryContext, query: &str, args: &[Value]) -> Result<ExecResult, Error> {
        self.calls.exec.fetch_add(1, Ordering::SeqCst);
        (self.exec_fn)(query, args)
    }

    async fn query(&self, _ctx: &QueryContext, query: &str, args: &[Value]) -> Result<Rows, Error> {
        self.calls.query.fetch_add(1, Ordering::SeqCst);
        (self.query_fn)(query, args)
    }

    async fn query_row(&self, _ctx: &QueryContext, query: &str, args: &[Value]) -> SingleRow {
        self.calls.query_row.fetch_add(1, Ordering::SeqCst);
        (self.query_row_fn)(query, args)
    }
}

#[async_trait]
impl PrepareExecutor for MockExecutor {
    type Statement = MockStatement;

    async fn prepare(&self, _ctx: &QueryContext, query: &str) -> Result<MockStatement, Error> {
        self.calls.prepare.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.prepare_delay {
            tokio::time::sleep(delay).await;
        }
        (self.prepare_fn)(query)?;
        self.calls.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(MockStatement { sql: query.to_string(), calls: self.calls.clone() })
    }
}

/// Statement produced by [`MockExecutor::prepare`].
#[derive(Debug)]
pub struct MockStatement {
    sql: String,
    calls: Arc<MockCalls>,
}

#[async_trait]
impl PreparedStatement for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn exec(&self, _ctx: &QueryContext, _args: &[Value]) -> Result<ExecResult, Error> {
        self.calls.stmt_exec.fetch_add(1, Ordering::SeqCst);
        Ok(ExecResult::default())
    }

    async fn query(&self, _ctx: &QueryContext, _args: &[Value]) -> Result<Rows, Error> {
        self.calls.stmt_query.fetch_add(1, Ordering::SeqCst);
        Ok(Rows::empty())
    }

    async fn query_row(&self, _ctx: &QueryContext, _args: &[Value]) -> SingleRow {
        self.calls.stmt_query_row.fetch_add(1, Ordering::SeqCst);
        SingleRow::no_rows()
    }

    async fn close(&self) -> Result<(), Error> {
        self.calls.stmt_close.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
