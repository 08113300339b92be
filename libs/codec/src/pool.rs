//! # Pooled Header Buffers
//!
//! ## Purpose
//!
//! Process-wide pool of byte buffers for frame header ranges. Connection
//! threads acquire a buffer sized for the header they are about to write and
//! the buffer returns to the pool when its last handle is dropped, so the
//! send path reuses a small working set instead of allocating per frame.
//!
//! ## Ownership
//!
//! ```text
//! acquire(size) → PooledBuf ──freeze()──→ Bytes (shared, ref-counted)
//!                    │                        │
//!                 drop (error path)       last clone dropped
//!                    └────────→ release ←─────┘
//! ```
//!
//! [`PooledBuf`] is an RAII guard: every exit path returns the buffer
//! exactly once, and a released buffer cannot be touched again because the
//! guard is gone.
//!
//! ## Size Classes
//!
//! Requests round up to a power-of-two multiple of `min_buffer_size`.
//! Requests above `max_pooled_buffer_size` are served unpooled and freed on
//! release.

use crate::config::PoolConfig;
use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

static GLOBAL_POOL: Lazy<BufferPool> = Lazy::new(|| BufferPool::new(PoolConfig::default()));

/// Errors raised when a pool is built from an unusable configuration
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("min_buffer_size must be a non-zero power of two, got {0}")]
    InvalidMinSize(usize),

    #[error("max_pooled_buffer_size {max} is smaller than min_buffer_size {min}")]
    InvalidMaxSize { min: usize, max: usize },
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Buffers handed out
    pub acquired: u64,
    /// Buffers returned
    pub released: u64,
    /// Fresh allocations (pool misses and oversize requests)
    pub allocated: u64,
    /// Buffers currently parked in free lists
    pub retained: u64,
}

impl PoolStats {
    /// Buffers acquired and not yet released
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

#[derive(Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    allocated: AtomicU64,
    retained: AtomicU64,
}

struct PoolInner {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
    config: PoolConfig,
    counters: Counters,
}

impl PoolInner {
    /// Size class for a request, or None when it is served unpooled
    fn class_for(&self, size: usize) -> Option<usize> {
        let min = self.config.min_buffer_size;
        let rounded = size.max(min).checked_next_power_of_two()?;
        if rounded > self.config.max_pooled_buffer_size {
            return None;
        }
        Some((rounded / min).trailing_zeros() as usize)
    }

    fn class_capacity(&self, class: usize) -> usize {
        self.config.min_buffer_size << class
    }

    fn release(&self, mut buf: Vec<u8>) {
        self.counters.released.fetch_add(1, Ordering::Release);

        // Only buffers whose capacity is exactly a class size go back
        let class = self
            .class_for(buf.capacity())
            .filter(|&class| self.class_capacity(class) == buf.capacity());

        if let Some(class) = class {
            let mut free = self.classes[class].lock();
            if free.len() < self.config.max_retained_per_class {
                buf.clear();
                free.push(buf);
                self.counters.retained.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        trace!(capacity = buf.capacity(), "Dropping buffer instead of pooling it");
    }
}

/// Shared handle to a buffer pool; clones refer to the same pool
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool, falling back to defaults for an invalid configuration
    pub fn new(config: PoolConfig) -> Self {
        Self::try_new(config.clone()).unwrap_or_else(|err| {
            warn!(error = %err, "Invalid pool configuration, using defaults");
            Self::build(PoolConfig::default())
        })
    }

    pub fn try_new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.min_buffer_size == 0 || !config.min_buffer_size.is_power_of_two() {
            return Err(PoolError::InvalidMinSize(config.min_buffer_size));
        }
        if config.max_pooled_buffer_size < config.min_buffer_size {
            return Err(PoolError::InvalidMaxSize {
                min: config.min_buffer_size,
                max: config.max_pooled_buffer_size,
            });
        }
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let max_class = config.max_pooled_buffer_size / config.min_buffer_size;
        let class_count = (usize::BITS - max_class.leading_zeros()) as usize;
        let classes = (0..class_count).map(|_| Mutex::new(Vec::new())).collect();

        Self {
            inner: Arc::new(PoolInner {
                classes,
                config,
                counters: Counters::default(),
            }),
        }
    }

    /// The process-wide pool used when no pool is supplied explicitly
    pub fn global() -> &'static BufferPool {
        &GLOBAL_POOL
    }

    /// Acquire an empty buffer with capacity for at least `size` bytes
    pub fn acquire(&self, size: usize) -> PooledBuf {
        let inner = &self.inner;
        inner.counters.acquired.fetch_add(1, Ordering::Relaxed);

        let buf = match inner.class_for(size) {
            Some(class) => match inner.classes[class].lock().pop() {
                Some(buf) => {
                    inner.counters.retained.fetch_sub(1, Ordering::Relaxed);
                    buf
                }
                None => {
                    inner.counters.allocated.fetch_add(1, Ordering::Relaxed);
                    Vec::with_capacity(inner.class_capacity(class))
                }
            },
            None => {
                inner.counters.allocated.fetch_add(1, Ordering::Relaxed);
                trace!(size, "Serving oversize buffer outside the pool");
                Vec::with_capacity(size)
            }
        };

        PooledBuf {
            buf,
            pool: Arc::clone(inner),
        }
    }

    /// Return a buffer; equivalent to dropping it
    pub fn release(&self, buf: PooledBuf) {
        drop(buf);
    }

    pub fn stats(&self) -> PoolStats {
        let counters = &self.inner.counters;
        // Released before acquired: any counted return implies its hand-out
        // is visible too.
        let released = counters.released.load(Ordering::Acquire);
        PoolStats {
            acquired: counters.acquired.load(Ordering::Relaxed),
            released,
            allocated: counters.allocated.load(Ordering::Relaxed),
            retained: counters.retained.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::build(PoolConfig::default())
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`]
///
/// Returned to the pool when dropped, directly or through the last
/// [`Bytes`] handle created by [`PooledBuf::freeze`].
pub struct PooledBuf {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PooledBuf {
    /// Writable view; callers append with `bytes::BufMut`
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Convert into a shared, immutable range that returns the buffer to the
    /// pool once every clone is dropped
    pub fn freeze(self) -> Bytes {
        Bytes::from_owner(self)
    }
}

impl Deref for PooledBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl AsRef<[u8]> for PooledBuf {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

impl fmt::Debug for PooledBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuf")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}
