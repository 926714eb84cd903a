//! Executor that prepares queries once and reuses the compiled statements.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};

use super::stats::{CacheStats, Counters};
use crate::Error;
use crate::context::QueryContext;
use crate::executor::{Executor, PrepareExecutor, PreparedStatement};
use crate::row::{ExecResult, Rows, SingleRow, Value};

/// Outcome of a prepare, published to callers waiting on the same text.
enum Prepare<S> {
    Pending,
    Ready(Arc<S>),
    Failed,
}

/// One cache entry. Only the caller that inserted a `Preparing` entry
/// replaces or removes it.
enum Entry<S> {
    Ready(Arc<S>),
    Preparing(watch::Receiver<Prepare<S>>),
}

/// What a caller does after looking up its query text.
enum Lookup<S> {
    Hit(Arc<S>),
    Wait(watch::Receiver<Prepare<S>>),
    Prepare(watch::Sender<Prepare<S>>),
}

impl<S> Entry<S> {
    /// `None` when the entry was left behind by a caller dropped mid-prepare.
    fn lookup(&self) -> Option<Lookup<S>> {
        match self {
            Entry::Ready(stmt) => Some(Lookup::Hit(stmt.clone())),
            Entry::Preparing(rx) if rx.has_changed().is_err() => None,
            Entry::Preparing(rx) => Some(Lookup::Wait(rx.clone())),
        }
    }
}

/// Wrap `store` so that queries are prepared once and reused.
///
/// See [`StmtCacheExecutor`].
pub fn wrap_with_stmt_cache<E: PrepareExecutor>(store: E) -> StmtCacheExecutor<E> {
    StmtCacheExecutor::new(store)
}

/// Executor that prepares every query on first use and reuses the prepared
/// statement for later calls with the same query text.
///
/// Statements are keyed by the exact query text, whitespace included, and are
/// kept until [`purge`](Self::purge) or [`close`](Self::close). The cache must
/// be disabled with [`QueryContext::with_stmt_cache_disabled`] for any query
/// that is not constant, e.g. one built by string concatenation for an
/// `IN (...)` list. Otherwise both this process and the database accumulate a
/// statement per distinct text.
///
/// Concurrent first use of a text runs a single prepare; the other callers
/// wait for its outcome. A prepare failure is never returned to the caller:
/// the failing call and everyone waiting on it fall back to the wrapped
/// executor's uncached path with the same query and arguments, and the next
/// call retries the prepare. Only execution errors are surfaced.
pub struct StmtCacheExecutor<E: PrepareExecutor> {
    store: E,
    stmts: RwLock<HashMap<String, Entry<E::Statement>>>,
    counters: Counters,
}

impl<E: PrepareExecutor> StmtCacheExecutor<E> {
    pub fn new(store: E) -> Self {
        Self { store, stmts: RwLock::new(HashMap::new()), counters: Counters::default() }
    }

    /// The wrapped executor.
    pub fn inner(&self) -> &E {
        &self.store
    }

    /// Number of prepared statements currently cached.
    pub async fn len(&self) -> usize {
        self.stmts
            .read()
            .await
            .values()
            .filter(|entry| matches!(entry, Entry::Ready(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Drop every cached statement, closing each one.
    ///
    /// Returns the number of statements released. Close failures are logged
    /// and still counted as released, since the entry is gone either way.
    /// Calls already executing keep their statement until they finish.
    /// Prepares still running are left alone; their statements are cached
    /// when they complete and released by a later purge or [`close`](Self::close).
    pub async fn purge(&self) -> usize {
        let drained: Vec<Arc<E::Statement>> = {
            let mut stmts = self.stmts.write().await;
            let ready: Vec<String> = stmts
                .iter()
                .filter(|(_, entry)| matches!(entry, Entry::Ready(_)))
                .map(|(query, _)| query.clone())
                .collect();
            ready
                .into_iter()
                .filter_map(|query| match stmts.remove(&query) {
                    Some(Entry::Ready(stmt)) => Some(stmt),
                    _ => None,
                })
                .collect()
        };

        let released = drained.len();
        for stmt in drained {
            if let Err(err) = stmt.close().await {
                tracing::warn!(query = %stmt.sql(), error = %err, "failed to close cached statement");
            }
        }

        tracing::debug!(released, "purged statement cache");
        released
    }

    /// Purge the cache and return the wrapped executor.
    pub async fn close(self) -> E {
        self.purge().await;
        self.store
    }

    /// Cached statement for `query`, preparing it on a miss.
    ///
    /// `None` means the call must take the uncached path, either because the
    /// context disables the cache or because the prepare failed.
    async fn statement(&self, ctx: &QueryContext, query: &str) -> Option<Arc<E::Statement>> {
        if ctx.is_stmt_cache_disabled() {
            self.counters.bypass();
            return None;
        }

        match self.lookup(query).await {
            Lookup::Hit(stmt) => {
                self.counters.hit();
                Some(stmt)
            }
            Lookup::Wait(rx) => self.wait_for_prepare(rx).await,
            Lookup::Prepare(tx) => self.prepare_and_publish(ctx, query, tx).await,
        }
    }

    async fn lookup(&self, query: &str) -> Lookup<E::Statement> {
        if let Some(found) = self.stmts.read().await.get(query).and_then(Entry::lookup) {
            return found;
        }

        let mut stmts = self.stmts.write().await;
        if let Some(found) = stmts.get(query).and_then(Entry::lookup) {
            return found;
        }

        let (tx, rx) = watch::channel(Prepare::Pending);
        stmts.insert(query.to_string(), Entry::Preparing(rx));
        Lookup::Prepare(tx)
    }

    /// Prepare `query` as the owner of its `Preparing` entry and publish
    /// the outcome to waiting callers.
    async fn prepare_and_publish(
        &self, ctx: &QueryContext, query: &str, tx: watch::Sender<Prepare<E::Statement>>,
    ) -> Option<Arc<E::Statement>> {
        self.counters.prepare();
        tracing::debug!(query, "statement cache miss, preparing");
        let result = self.store.prepare(ctx, query).await;

        let mut stmts = self.stmts.write().await;
        match result {
            Ok(stmt) => {
                let stmt = Arc::new(stmt);
                stmts.insert(query.to_string(), Entry::Ready(stmt.clone()));
                tx.send_replace(Prepare::Ready(stmt.clone()));
                Some(stmt)
            }
            Err(err) => {
                stmts.remove(query);
                tx.send_replace(Prepare::Failed);
                drop(stmts);

                self.counters.prepare_failure();
                tracing::warn!(query, error = %err, "prepare failed, executing without statement cache");
                None
            }
        }
    }

    /// Wait for another caller's prepare of the same text.
    async fn wait_for_prepare(&self, mut rx: watch::Receiver<Prepare<E::Statement>>) -> Option<Arc<E::Statement>> {
        let outcome = rx.wait_for(|state| !matches!(state, Prepare::Pending)).await.ok()?;
        match &*outcome {
            Prepare::Ready(stmt) => {
                self.counters.hit();
                Some(stmt.clone())
            }
            Prepare::Pending | Prepare::Failed => None,
        }
    }
}

#[async_trait]
impl<E: PrepareExecutor> Executor for StmtCacheExecutor<E> {
    async fn exec(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> Result<ExecResult, Error> {
        match self.statement(ctx, query).await {
            Some(stmt) => stmt.exec(ctx, args).await,
            None => self.store.exec(ctx, query, args).await,
        }
    }

    async fn query(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> Result<Rows, Error> {
        match self.statement(ctx, query).await {
            Some(stmt) => stmt.query(ctx, args).await,
            None => self.store.query(ctx, query, args).await,
        }
    }

    async fn query_row(&self, ctx: &QueryContext, query: &str, args: &[Value]) -> SingleRow {
        match self.statement(ctx, query).await {
            Some(stmt) => stmt.query_row(ctx, args).await,
            None => self.store.query_row(ctx, query, args).await,
        }
    }
}
