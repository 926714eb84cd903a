//! Concurrency-bounded task group.
//!
//! [`BoundedGroup`] runs fallible async tasks with at most `limit` of them in
//! flight. A task only starts once it holds a permit. The first failure
//! cancels the group: tasks still waiting for a permit are never started, and
//! running tasks can observe the cancellation through a [`GroupToken`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use crate::Error;
use crate::config::StoreConfig;

/// Cancellation signal shared by the tasks of a [`BoundedGroup`].
#[derive(Clone, Debug)]
pub struct GroupToken {
    rx: watch::Receiver<bool>,
}

impl GroupToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the group is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // An error means the group is gone, which only happens after `wait`.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Group of tasks with bounded concurrency and fail-fast cancellation.
pub struct BoundedGroup {
    tasks: JoinSet<Result<(), Error>>,
    permits: Arc<Semaphore>,
    cancel: Arc<watch::Sender<bool>>,
    token: GroupToken,
}

impl BoundedGroup {
    /// Create a group running at most `limit` tasks at once.
    pub fn new(limit: usize) -> Result<Self, Error> {
        if limit == 0 {
            return Err(Error::InvalidInput("task group limit must be greater than 0".to_string()));
        }

        let (tx, rx) = watch::channel(false);
        Ok(Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(limit)),
            cancel: Arc::new(tx),
            token: GroupToken { rx },
        })
    }

    /// Create a group bounded by the configured `max_concurrency`.
    pub fn from_config(config: &StoreConfig) -> Result<Self, Error> {
        Self::new(config.max_concurrency)
    }

    /// Token tasks can use to notice that the group was cancelled.
    pub fn token(&self) -> GroupToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Start `task` once a permit is free.
    ///
    /// Waits while `limit` tasks are running. If the group is cancelled
    /// before a permit is acquired, `task` is dropped without being polled.
    pub async fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            _ = self.token.cancelled() => return,
            permit = self.permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        if self.is_cancelled() {
            return;
        }

        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let result = task.await;
            // Cancel before freeing the permit so no waiting spawn starts.
            if let Err(err) = &result {
                tracing::debug!(error = %err, "task failed, cancelling group");
                cancel.send_replace(true);
            }
            drop(permit);
            result
        });
    }

    /// Wait for every started task and return the first error, if any.
    pub async fn wait(mut self) -> Result<(), Error> {
        let mut first_err = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = joined.map_err(|e| Error::TaskFailed(e.to_string())).and_then(|r| r);
            if let Err(err) = result {
                self.cancel.send_replace(true);
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::{Executor, QueryContext, Value, wrap_with_stmt_cache};
    use crate::testing::MockExecutor;

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(BoundedGroup::new(0), Err(Error::InvalidInput(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut group = BoundedGroup::new(3).unwrap();

        for _ in 0..12 {
            let running = running.clone();
            let peak = peak.clone();
            group
                .spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await;
        }

        group.wait().await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_first_error_cancels_pending_tasks() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut group = BoundedGroup::new(1).unwrap();

        group
            .spawn(async { Err(Error::InvalidInput("first".to_string())) })
            .await;

        for _ in 0..5 {
            let started = started.clone();
            group
                .spawn(async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await;
        }

        assert!(group.is_cancelled());
        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg == "first"));
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_cancels_before_permit_is_reused() {
        for _ in 0..50 {
            let started = Arc::new(AtomicUsize::new(0));
            let mut group = BoundedGroup::new(1).unwrap();

            group
                .spawn(async {
                    tokio::task::yield_now().await;
                    Err(Error::InvalidInput("first".to_string()))
                })
                .await;

            for _ in 0..3 {
                let started = started.clone();
                group
                    .spawn(async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await;
            }

            assert!(group.wait().await.is_err());
            assert_eq!(started.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_running_tasks_observe_cancellation() {
        let mut group = BoundedGroup::new(2).unwrap();
        let token = group.token();

        group
            .spawn(async move {
                token.cancelled().await;
                Ok(())
            })
            .await;
        group
            .spawn(async { Err(Error::InvalidInput("boom".to_string())) })
            .await;

        assert!(group.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_panic_becomes_task_failed() {
        let mut group = BoundedGroup::new(1).unwrap();
        let should_panic = true;
        group
            .spawn(async move {
                assert!(!should_panic, "task panicked");
                Ok(())
            })
            .await;
        assert!(matches!(group.wait().await, Err(Error::TaskFailed(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_queries_share_statement_cache() {
        let mock = MockExecutor::new();
        let calls = mock.calls();
        let store = Arc::new(wrap_with_stmt_cache(mock));
        let config = StoreConfig { max_concurrency: 4, ..Default::default() };
        let mut group = BoundedGroup::from_config(&config).unwrap();

        for i in 0..20 {
            let store = store.clone();
            group
                .spawn(async move {
                    let query = if i % 2 == 0 { "SELECT a FROM t WHERE id = ?1" } else { "SELECT b FROM t" };
                    store.query(&QueryContext::background(), query, &[Value::Integer(i)]).await?;
                    Ok(())
                })
                .await;
        }

        group.wait().await.unwrap();
        assert_eq!(calls.prepares(), 2);
        assert_eq!(calls.cached(), 20);
    }
}
