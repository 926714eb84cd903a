//! Statement cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of statement cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls served by an already-prepared statement.
    pub hits: u64,
    /// Prepares issued to the wrapped executor, successful or not.
    pub prepares: u64,
    /// Prepares that failed and fell back to the uncached path.
    pub prepare_failures: u64,
    /// Calls that skipped the cache because their context disabled it.
    pub bypassed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    prepares: AtomicU64,
    prepare_failures: AtomicU64,
    bypassed: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn prepare(&self) {
        self.prepares.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn prepare_failure(&self) {
        self.prepare_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bypass(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            prepares: self.prepares.load(Ordering::Relaxed),
            prepare_failures: self.prepare_failures.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }
}
