//! The recycling pool.
//!
//! A [`Pool`] hands out byte buffers of one fixed size, takes them back for
//! reuse, and runs a background sweeper that reclaims buffers left idle for
//! longer than the configured expiration.
//!
//! # Examples
//!
//! ```rust
//! use bpool::Pool;
//!
//! # #[tokio::main]
//! # async fn main() -> bpool::PoolResult<()> {
//! let pool = Pool::new(1024, 10)?;
//!
//! let mut buf = pool.acquire();
//! assert_eq!(buf.len(), 1024);
//! buf[0] = 42;
//! pool.release(buf);
//!
//! assert_eq!(pool.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::buffer::PooledBuffer;
use crate::config::{FullPolicy, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::stats::{Counters, PoolStats};
use crate::sweeper::Sweeper;
use std::collections::VecDeque;
use std::fmt;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// A released buffer waiting to be reused.
struct Record {
    data: Vec<u8>,
    last_returned: Instant,
}

pub(crate) struct PoolInner {
    // Ordered by `last_returned`: releases push to the back under the lock.
    holding: Mutex<VecDeque<Record>>,
    space: Condvar,
    config: PoolConfig,
    expiration: Duration,
    counters: Counters,
    #[cfg(test)]
    fail_next_sweep: AtomicBool,
}

impl PoolInner {
    fn new(config: PoolConfig) -> Self {
        Self {
            holding: Mutex::new(VecDeque::new()),
            space: Condvar::new(),
            expiration: config.expiration(),
            config,
            counters: Counters::default(),
            #[cfg(test)]
            fail_next_sweep: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Record>> {
        self.holding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn acquire(&self) -> Vec<u8> {
        let record = self.lock().pop_front();
        match record {
            Some(record) => {
                self.space.notify_one();
                self.counters.hit();
                record.data
            }
            None => {
                self.counters.miss();
                vec![0; self.config.buffer_size]
            }
        }
    }

    pub(crate) fn release(&self, mut buf: Vec<u8>) {
        let size = self.config.buffer_size;
        if buf.capacity() != size {
            self.counters.rejected();
            trace!(capacity = buf.capacity(), buffer_size = size, "discarding mismatched buffer");
            return;
        }
        if buf.len() < size {
            buf.resize(size, 0);
        }

        let max = self.config.max_pooled;
        let mut holding = self.lock();
        if holding.len() >= max {
            match self.config.full_policy {
                FullPolicy::DropNewest => {
                    drop(holding);
                    self.counters.dropped();
                    trace!(max_pooled = max, "pool full, discarding released buffer");
                    return;
                }
                FullPolicy::DropOldest => {
                    holding.pop_front();
                    self.counters.dropped();
                    trace!(max_pooled = max, "pool full, evicting oldest buffer");
                }
                FullPolicy::Block => {
                    holding = self
                        .space
                        .wait_while(holding, |holding| holding.len() >= max)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }

        holding.push_back(Record {
            data: buf,
            last_returned: Instant::now(),
        });
        drop(holding);
        self.counters.returned();
    }

    /// Evicts the expired prefix of the holding area and returns how many
    /// records went.
    pub(crate) fn sweep(&self) -> usize {
        let mut holding = self.lock();
        #[cfg(test)]
        if self.fail_next_sweep.swap(false, Ordering::SeqCst) {
            panic!("sweep failure while holding the pool lock");
        }
        if holding.is_empty() {
            return 0;
        }

        let now = Instant::now();
        let mut expired = 0;
        while let Some(record) = holding.front() {
            // A deadline past the clock's range never expires.
            match record.last_returned.checked_add(self.expiration) {
                Some(deadline) if deadline < now => {
                    holding.pop_front();
                    expired += 1;
                }
                _ => break,
            }
        }
        let remaining = holding.len();
        drop(holding);

        self.counters.swept(expired);
        if expired > 0 {
            self.space.notify_all();
            debug!(expired, remaining, "reclaimed idle buffers");
        }
        expired
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// A fixed-size byte buffer recycling pool.
///
/// Cloning a `Pool` yields another handle to the same buffers. The background
/// sweeper stops when [`shutdown`](Pool::shutdown) is called or the last
/// handle is dropped.
///
/// Recycled buffers are *not* zeroed: a buffer returned by
/// [`acquire`](Pool::acquire) may still hold whatever the previous user wrote
/// into it. Callers are expected to overwrite it.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
    sweeper: Arc<Sweeper>,
}

impl Pool {
    /// Creates a pool of `buffer_size`-byte buffers that are reclaimed after
    /// `expiration_secs` seconds of idleness.
    ///
    /// Must be called from within a tokio runtime, which hosts the sweeper.
    pub fn new(buffer_size: usize, expiration_secs: u64) -> PoolResult<Self> {
        Self::with_config(PoolConfig::new(buffer_size, expiration_secs))
    }

    /// Creates a pool from a full configuration on the current tokio runtime.
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        let handle = Handle::try_current().map_err(|_| PoolError::NoRuntime)?;
        Self::with_handle(config, &handle)
    }

    /// Creates a pool whose sweeper runs on `handle`.
    pub fn with_handle(config: PoolConfig, handle: &Handle) -> PoolResult<Self> {
        config.validate()?;

        debug!(
            buffer_size = config.buffer_size,
            expiration_secs = config.expiration_secs,
            max_pooled = config.max_pooled,
            policy = ?config.full_policy,
            "starting buffer pool"
        );

        let interval = config.interval();
        let inner = Arc::new(PoolInner::new(config));
        let sweeper = Sweeper::spawn(Arc::downgrade(&inner), interval, handle);

        Ok(Self {
            inner,
            sweeper: Arc::new(sweeper),
        })
    }

    /// Takes a buffer from the pool, or allocates a zeroed one if the pool is
    /// empty. The result is always exactly `buffer_size` bytes long.
    pub fn acquire(&self) -> Vec<u8> {
        self.inner.acquire()
    }

    /// Returns a buffer to the pool.
    ///
    /// Buffers whose capacity differs from `buffer_size` are silently
    /// discarded. A short buffer with the right capacity is extended to its
    /// full length before it is stored.
    pub fn release(&self, buf: Vec<u8>) {
        self.inner.release(buf)
    }

    /// Acquires a buffer wrapped in a guard that releases it on drop.
    pub fn checkout(&self) -> PooledBuffer {
        PooledBuffer::new(self.inner.acquire(), Arc::downgrade(&self.inner))
    }

    /// Runs one sweep immediately and returns the number of buffers reclaimed.
    pub fn sweep_now(&self) -> usize {
        self.inner.sweep()
    }

    /// Stops the background sweeper and waits for it to finish.
    ///
    /// The pool keeps serving acquire and release afterwards; it just no
    /// longer reclaims idle buffers on its own.
    pub async fn shutdown(&self) {
        self.sweeper.stop().await;
    }

    /// Number of idle buffers currently held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the pool holds no idle buffers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of every buffer this pool hands out.
    pub fn buffer_size(&self) -> usize {
        self.inner.config.buffer_size
    }

    /// Idle time after which a held buffer may be reclaimed.
    pub fn expiration(&self) -> Duration {
        self.inner.expiration
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Snapshot of the pool's counters and current idle count.
    pub fn stats(&self) -> PoolStats {
        self.inner.counters.snapshot(self.len())
    }

    #[cfg(test)]
    pub(crate) fn sweeper(&self) -> &Arc<Sweeper> {
        &self.sweeper
    }

    /// Makes the next sweep panic while it holds the pool lock.
    #[cfg(test)]
    pub(crate) fn fail_next_sweep(&self) {
        self.inner.fail_next_sweep.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("buffer_size", &self.buffer_size())
            .field("expiration", &self.expiration())
            .field("idle", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn pool_with(config: PoolConfig) -> Pool {
        Pool::with_config(config).unwrap()
    }

    #[tokio::test]
    async fn test_acquire_fresh_buffer() {
        let pool = Pool::new(1024, 10).unwrap();
        let buf = pool.acquire();
        assert_eq!(buf.len(), 1024);
        assert_eq!(buf.capacity(), 1024);
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(pool.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_release_then_acquire_reuses() {
        let pool = Pool::new(64, 10).unwrap();
        assert_eq!(pool.len(), 0);

        let buf = pool.acquire();
        let ptr = buf.as_ptr();
        pool.release(buf);
        assert_eq!(pool.len(), 1);

        let again = pool.acquire();
        assert_eq!(pool.len(), 0);
        assert_eq!(again.as_ptr(), ptr);

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.returns, 1);
    }

    #[tokio::test]
    async fn test_reuse_does_not_zero() {
        let pool = Pool::new(8, 10).unwrap();
        let mut buf = pool.acquire();
        buf.copy_from_slice(b"leftover");
        pool.release(buf);

        assert_eq!(&pool.acquire()[..], b"leftover");
    }

    #[tokio::test]
    async fn test_release_rejects_wrong_capacity() {
        let pool = Pool::new(128, 10).unwrap();
        pool.release(Vec::with_capacity(64));
        pool.release(vec![0; 256]);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.stats().rejected, 2);
    }

    #[tokio::test]
    async fn test_release_extends_short_buffer() {
        let pool = Pool::new(32, 10).unwrap();
        let mut buf = pool.acquire();
        buf.truncate(5);
        assert_eq!(buf.capacity(), 32);
        pool.release(buf);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.acquire().len(), 32);
    }

    #[tokio::test]
    async fn test_drop_newest_when_full() {
        let mut config = PoolConfig::new(4, 10);
        config.max_pooled(2);
        let pool = pool_with(config);

        for fill in 1..=3u8 {
            pool.release(vec![fill; 4]);
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.stats().dropped, 1);
        assert_eq!(pool.acquire()[0], 1);
        assert_eq!(pool.acquire()[0], 2);
    }

    #[tokio::test]
    async fn test_drop_oldest_when_full() {
        let mut config = PoolConfig::new(4, 10);
        config.max_pooled(2).full_policy(FullPolicy::DropOldest);
        let pool = pool_with(config);

        for fill in 1..=3u8 {
            pool.release(vec![fill; 4]);
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.stats().dropped, 1);
        assert_eq!(pool.acquire()[0], 2);
        assert_eq!(pool.acquire()[0], 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_waits_for_space() {
        let mut config = PoolConfig::new(4, 10);
        config.max_pooled(1).full_policy(FullPolicy::Block);
        let pool = pool_with(config);
        pool.release(vec![1; 4]);

        let blocked = pool.clone();
        let releaser = thread::spawn(move || blocked.release(vec![2; 4]));

        thread::sleep(Duration::from_millis(50));
        assert!(!releaser.is_finished());
        assert_eq!(pool.acquire()[0], 1);

        releaser.join().unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.acquire()[0], 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_woken_by_sweep() {
        let mut config = PoolConfig::new(4, 0);
        config.max_pooled(1).full_policy(FullPolicy::Block);
        let pool = pool_with(config);
        pool.release(vec![1; 4]);

        let blocked = pool.clone();
        let releaser = thread::spawn(move || blocked.release(vec![2; 4]));

        // The background sweep (every second) evicts the first buffer and
        // frees the only slot.
        thread::sleep(Duration::from_millis(1500));
        assert!(releaser.is_finished());
        releaser.join().unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.stats().expired, 1);
        assert_eq!(pool.acquire()[0], 2);
    }

    #[tokio::test]
    async fn test_sweep_now_only_evicts_expired() {
        let pool = Pool::new(16, 0).unwrap();
        assert_eq!(pool.sweep_now(), 0);

        pool.release(vec![0; 16]);
        pool.release(vec![0; 16]);
        thread::sleep(Duration::from_millis(5));
        assert_eq!(pool.sweep_now(), 2);
        assert!(pool.is_empty());
        assert_eq!(pool.stats().expired, 2);
    }

    #[tokio::test]
    async fn test_sweep_keeps_fresh_buffers() {
        let pool = Pool::new(16, 3600).unwrap();
        pool.release(vec![0; 16]);
        assert_eq!(pool.sweep_now(), 0);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_huge_expiration_never_overflows() {
        let pool = Pool::new(16, u64::MAX).unwrap();
        pool.release(vec![0; 16]);
        assert_eq!(pool.sweep_now(), 0);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_pools_are_independent() {
        let a = Pool::new(256, 5).unwrap();
        let b = Pool::new(256, 5).unwrap();

        a.release(a.acquire());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 0);
        assert_eq!(b.stats().returns, 0);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(Pool::new(16, 1), Err(PoolError::NoRuntime)));
    }

    #[test]
    fn test_with_handle_outside_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pool = Pool::with_handle(PoolConfig::new(16, 1), runtime.handle()).unwrap();
        pool.release(pool.acquire());
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        assert!(matches!(Pool::new(0, 1), Err(PoolError::InvalidConfig(_))));
    }
}
