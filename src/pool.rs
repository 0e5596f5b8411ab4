//! Injected buffer allocator shared by every component of one writer
//!
//! Table writers draw their batch buffers from the pool and return them on
//! close; the combined-file splice draws its copy buffer the same way. The
//! pool recycles released buffers and keeps byte accounting so that callers
//! can observe peak usage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Maximum number of released buffers kept for reuse
const MAX_CACHED_BUFFERS: usize = 8;

/// Released buffers larger than this go back to the allocator
const MAX_CACHED_CAPACITY: usize = 4 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct MemoryPool {
    /// Bytes currently handed out
    bytes_allocated: AtomicUsize,
    /// Highest value `bytes_allocated` has reached
    max_memory: AtomicUsize,
    /// Released buffers available for reuse
    free: Mutex<Vec<Vec<u8>>>,
}
impl MemoryPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default pool
    pub fn system() -> Arc<Self> {
        static SYSTEM: OnceLock<Arc<MemoryPool>> = OnceLock::new();
        SYSTEM.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Returns an empty buffer with at least `capacity` bytes reserved
    ///
    /// Serves the request from the smallest cached buffer that fits.
    pub fn allocate(&self, capacity: usize) -> Vec<u8> {
        let reused = {
            let mut free = self.free.lock();
            free.iter()
                .enumerate()
                .filter(|(_, buf)| buf.capacity() >= capacity)
                .min_by_key(|(_, buf)| buf.capacity())
                .map(|(pos, _)| pos)
                .map(|pos| free.swap_remove(pos))
        };
        let buf = reused.unwrap_or_else(|| Vec::with_capacity(capacity));

        let total = self
            .bytes_allocated
            .fetch_add(buf.capacity(), Ordering::Relaxed)
            + buf.capacity();
        self.max_memory.fetch_max(total, Ordering::Relaxed);
        buf
    }

    /// Hands a buffer back to the pool
    pub fn release(&self, mut buf: Vec<u8>) {
        // capacity may have grown since allocation
        let capacity = buf.capacity();
        let _ = self
            .bytes_allocated
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(capacity))
            });

        if capacity > MAX_CACHED_CAPACITY {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < MAX_CACHED_BUFFERS {
            free.push(buf);
        }
    }

    /// Bytes currently held by buffers drawn from this pool
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    /// Peak value of [`bytes_allocated`](Self::bytes_allocated)
    pub fn max_memory(&self) -> usize {
        self.max_memory.load(Ordering::Relaxed)
    }
}
