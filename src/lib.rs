//! # bpool
//!
//! A fixed-size byte buffer recycling pool.
//!
//! ## Features
//!
//! - Reuse of released buffers to avoid allocation churn
//! - Background sweeper that reclaims buffers left idle past an expiration
//! - Bounded holding area with a configurable policy when full
//! - RAII checkout guard that returns buffers on drop
//! - Hit/miss/expiry statistics
//!
//! ## Quick Start
//!
//! ```rust
//! use bpool::Pool;
//!
//! #[tokio::main]
//! async fn main() -> bpool::PoolResult<()> {
//!     // 1KB buffers, reclaimed after 10 idle seconds
//!     let pool = Pool::new(1024, 10)?;
//!
//!     let buf = pool.acquire();
//!     assert_eq!(buf.len(), 1024);
//!     pool.release(buf);
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use bpool::{FullPolicy, Pool, PoolConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> bpool::PoolResult<()> {
//! let mut config = PoolConfig::new(64 * 1024, 30);
//! config.max_pooled(256).full_policy(FullPolicy::DropOldest);
//! let pool = Pool::with_config(config)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod pool;
pub mod stats;
mod sweeper;

pub use buffer::PooledBuffer;
pub use config::{FullPolicy, PoolConfig};
pub use error::{PoolError, PoolResult};
pub use pool::Pool;
pub use stats::PoolStats;
