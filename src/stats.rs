use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for one pool. Updated with relaxed atomics outside the
/// pool lock, so a snapshot is only approximately consistent under load.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
    expired: AtomicU64,
    sweeps: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn returned(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn swept(&self, expired: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.expired.fetch_add(expired as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, idle: usize) -> PoolStats {
        PoolStats {
            idle,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buffers currently held by the pool.
    pub idle: usize,
    /// Acquires served from the pool.
    pub hits: u64,
    /// Acquires that allocated a fresh buffer.
    pub misses: u64,
    /// Buffers stored by release.
    pub returns: u64,
    /// Releases discarded for having the wrong capacity.
    pub rejected: u64,
    /// Buffers discarded because the pool was full.
    pub dropped: u64,
    /// Buffers reclaimed by the sweeper.
    pub expired: u64,
    /// Sweeps that found buffers to inspect.
    pub sweeps: u64,
}

impl PoolStats {
    /// Fraction of acquires served from the pool (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
