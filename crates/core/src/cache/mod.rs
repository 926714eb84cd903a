//! Prepared-statement cache in front of a [`PrepareExecutor`](crate::PrepareExecutor).
//!
//! Queries are prepared on first use and the compiled statement is reused for
//! every later call with the same query text. It supports:
//!
//! - Per-call opt out through [`QueryContext`](crate::QueryContext)
//! - Fallback to uncached execution when a prepare fails
//! - Single prepare per query text under concurrent first use
//! - Explicit release of cached statements (purge/close)

pub mod executor;
pub mod stats;

pub use executor::{StmtCacheExecutor, wrap_with_stmt_cache};
pub use stats::CacheStats;
