//! Core types and shared functionality for sqlstore.
//!
//! This crate provides:
//! - Executor traits and the row/result types they exchange
//! - A prepared-statement cache wrapping any prepare-capable executor
//! - A SQLite executor backed by tokio-rusqlite
//! - A concurrency-bounded task group
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod row;
pub mod sqlite;
pub mod task_group;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CacheStats, StmtCacheExecutor, wrap_with_stmt_cache};
pub use config::StoreConfig;
pub use context::{QueryContext, with_stmt_cache_disabled};
pub use error::Error;
pub use executor::{Executor, PrepareExecutor, PreparedStatement};
pub use row::{ExecResult, Row, Rows, SingleRow, Value};
pub use sqlite::{SqliteExecutor, SqliteStatement};
pub use task_group::{BoundedGroup, GroupToken};
