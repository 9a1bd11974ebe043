use crate::pool::PoolInner;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Weak;

/// A buffer checked out from a [`Pool`](crate::pool::Pool).
/// Returns to the pool on drop, unless the pool is already gone.
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Weak<PoolInner>,
}

impl PooledBuffer {
    pub(crate) fn new(buf: Vec<u8>, pool: Weak<PoolInner>) -> Self {
        Self {
            buf: Some(buf),
            pool,
        }
    }

    /// Take the buffer, preventing return to the pool.
    pub fn detach(mut self) -> Vec<u8> {
        self.buf.take().unwrap_or_default()
    }

    fn as_vec(&self) -> &Vec<u8> {
        const EMPTY: &Vec<u8> = &Vec::new();
        self.buf.as_ref().unwrap_or(EMPTY)
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_vec()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl AsMut<[u8]> for PooledBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.as_vec().len())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            if let Some(pool) = self.pool.upgrade() {
                pool.release(buf);
            }
        }
    }
}
