//! Bounded replay buffer for forwarded audio chunks
//!
//! A fixed-capacity FIFO: pushing into a full buffer evicts the oldest chunk.
//! Every operation takes the same lock, so readers never see a half-applied
//! push or clear.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::AudioChunk;

/// Ring buffer of the most recent audio chunks
pub struct AudioRingBuffer {
    chunks: Mutex<VecDeque<AudioChunk>>,
    capacity: usize,
    pushed_count: AtomicU64,
    evicted_count: AtomicU64,
}

impl AudioRingBuffer {
    /// Create a new ring buffer with the specified capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be non-zero");

        Self {
            chunks: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            pushed_count: AtomicU64::new(0),
            evicted_count: AtomicU64::new(0),
        }
    }

    /// Append a chunk at the tail, evicting from the head when over capacity
    ///
    /// Returns the evicted chunk, if any.
    pub fn push(&self, chunk: AudioChunk) -> Option<AudioChunk> {
        let evicted = {
            let mut chunks = self.chunks.lock();
            chunks.push_back(chunk);
            if chunks.len() > self.capacity {
                chunks.pop_front()
            } else {
                None
            }
        };

        self.pushed_count.fetch_add(1, Ordering::Relaxed);
        if evicted.is_some() {
            self.evicted_count.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<AudioChunk> {
        self.chunks.lock().iter().cloned().collect()
    }

    /// Empty the buffer, returning how many chunks were dropped
    pub fn clear(&self) -> usize {
        let mut chunks = self.chunks.lock();
        let dropped = chunks.len();
        chunks.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total chunks ever pushed
    pub fn pushed_count(&self) -> u64 {
        self.pushed_count.load(Ordering::Relaxed)
    }

    /// Total chunks dropped by FIFO eviction
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count.load(Ordering::Relaxed)
    }
}
