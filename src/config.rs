use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default size of pooled buffers (8KB).
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default idle time before a released buffer may be reclaimed.
pub const DEFAULT_EXPIRATION_SECS: u64 = 10;

/// Default ceiling on idle buffers held by a pool.
pub const DEFAULT_MAX_POOLED: usize = 10_000;

/// Default cadence of the reclamation sweep.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1000;

/// What `release` does when the holding area is already at `max_pooled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullPolicy {
    /// Discard the buffer being released.
    #[default]
    DropNewest,
    /// Evict the longest-idle buffer to make room.
    DropOldest,
    /// Wait until an acquire or a sweep frees a slot.
    ///
    /// Blocks the calling thread, so avoid it on async worker threads.
    Block,
}

/// Configuration for a [`Pool`](crate::pool::Pool).
///
/// # Example
///
/// ```rust
/// use bpool::config::{FullPolicy, PoolConfig};
///
/// let mut config = PoolConfig::new(4096, 30);
/// config.max_pooled(512).full_policy(FullPolicy::DropOldest);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub buffer_size: usize,
    pub expiration_secs: u64,
    pub max_pooled: usize,
    pub full_policy: FullPolicy,
    pub sweep_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            max_pooled: DEFAULT_MAX_POOLED,
            full_policy: FullPolicy::default(),
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration for `buffer_size`-byte buffers that expire after
    /// `expiration_secs` seconds of idleness. Everything else takes its default.
    pub fn new(buffer_size: usize, expiration_secs: u64) -> Self {
        Self {
            buffer_size,
            expiration_secs,
            ..Self::default()
        }
    }

    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> PoolResult<Self> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn buffer_size(&mut self, buffer_size: usize) -> &mut Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn expiration_secs(&mut self, expiration_secs: u64) -> &mut Self {
        self.expiration_secs = expiration_secs;
        self
    }

    pub fn max_pooled(&mut self, max_pooled: usize) -> &mut Self {
        self.max_pooled = max_pooled;
        self
    }

    pub fn full_policy(&mut self, full_policy: FullPolicy) -> &mut Self {
        self.full_policy = full_policy;
        self
    }

    /// Sets the sweep cadence. Stored with millisecond granularity: a
    /// non-zero interval shorter than 1ms rounds up to 1ms, and intervals too
    /// long for `u64` milliseconds saturate.
    pub fn sweep_interval(&mut self, interval: Duration) -> &mut Self {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.sweep_interval_ms = if millis == 0 && !interval.is_zero() {
            1
        } else {
            millis
        };
        self
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Rejects configurations the pool cannot honour.
    pub fn validate(&self) -> PoolResult<()> {
        if self.buffer_size == 0 {
            return Err(PoolError::invalid("buffer_size must be positive"));
        }
        if self.max_pooled == 0 {
            return Err(PoolError::invalid("max_pooled must be positive"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(PoolError::invalid("sweep_interval_ms must be positive"));
        }
        Ok(())
    }
}
