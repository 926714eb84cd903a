//! Per-call execution context.
//!
//! Every executor call takes a [`QueryContext`]. It carries the flag that
//! disables the statement cache for that call and an optional deadline that
//! drivers may enforce. Contexts are cheap values: deriving a new one never
//! affects the context it came from.

use std::time::Duration;

use crate::config::StoreConfig;

/// Call-scoped options threaded through every executor call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryContext {
    stmt_cache_disabled: bool,
    timeout: Option<Duration>,
}

impl QueryContext {
    /// Context with caching enabled and no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that bypasses the statement cache.
    ///
    /// Use this for every call whose query text is not constant, e.g. when an
    /// `IN (...)` list is built by string concatenation. Caching such queries
    /// grows the cache without bound and pins compiled statements in the
    /// database.
    pub fn with_stmt_cache_disabled(&self) -> Self {
        Self { stmt_cache_disabled: true, ..*self }
    }

    /// Derive a context whose calls must complete within `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self { timeout: Some(timeout), ..*self }
    }

    /// Deadline for calls made with this context, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn is_stmt_cache_disabled(&self) -> bool {
        self.stmt_cache_disabled
    }
}

impl From<&StoreConfig> for QueryContext {
    /// Background context bounded by the configured query timeout.
    fn from(config: &StoreConfig) -> Self {
        Self::background().with_timeout(config.query_timeout())
    }
}

/// Derive a context from `ctx` that bypasses the statement cache.
pub fn with_stmt_cache_disabled(ctx: &QueryContext) -> QueryContext {
    ctx.with_stmt_cache_disabled()
}
