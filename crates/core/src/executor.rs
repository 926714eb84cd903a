//! Execution capabilities.
//!
//! [`Executor`] is what application code calls. [`PrepareExecutor`] is an
//! executor that can also compile query text into a [`PreparedStatement`],
//! which is what the statement cache consumes.

use async_trait::async_trait;

use crate::context::QueryContext;
use crate::row::{ExecResult, Rows, SingleRow, Value};
use crate::Error;

/// Issue no-rows, multi-row and single-row database calls.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a query without returning any rows.
    async fn exec(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> Result<ExecResult, Error>;

    /// Execute a query that returns rows, typically a SELECT.
    async fn query(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> Result<Rows, Error>;

    /// Execute a query expected to return at most one row.
    ///
    /// Never fails at call time; errors are deferred until the row is read.
    async fn query_row(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> SingleRow;
}

/// An executor that can compile query text into a reusable statement.
#[async_trait]
pub trait PrepareExecutor: Executor {
    type Statement: PreparedStatement;

    async fn prepare(&self, ctx: &QueryContext, query: &str) -> Result<Self::Statement, Error>;
}

/// A compiled query, executable repeatedly with different arguments.
#[async_trait]
pub trait PreparedStatement: Send + Sync + 'static {
    /// Query text this statement was compiled from.
    fn sql(&self) -> &str;

    async fn exec(&self, ctx: &QueryContext, args: &[Value]) -> Result<ExecResult, Error>;

    async fn query(&self, ctx: &QueryContext, args: &[Value]) -> Result<Rows, Error>;

    async fn query_row(&self, ctx: &QueryContext, args: &[Value]) -> SingleRow;

    /// Release driver resources held by the statement.
    ///
    /// Drivers that reclaim statements on drop can keep the default.
    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
