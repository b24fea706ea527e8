//! Lock-free sample ring between the device callback and the stream loop
//!
//! Single producer (the cpal callback thread), single consumer (the
//! streaming loop). When the consumer falls behind, the producer drops
//! samples and bumps the overflow counter; the consumer reads that counter
//! to detect an overrun.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free ring buffer for mono 16-bit samples
pub struct SampleRing {
    queue: ArrayQueue<i16>,
    overflow_count: AtomicUsize,
}

impl SampleRing {
    /// Create a new ring buffer with room for `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            overflow_count: AtomicUsize::new(0),
        }
    }

    /// Push samples, dropping the ones that do not fit.
    /// Returns the number accepted.
    pub fn push_slice(&self, samples: &[i16]) -> usize {
        let mut accepted = 0;
        for &sample in samples {
            if self.queue.push(sample).is_err() {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
            } else {
                accepted += 1;
            }
        }
        accepted
    }

    /// Pop up to `out.len()` samples into `out`. Returns the number written.
    pub fn pop_into(&self, out: &mut [i16]) -> usize {
        let mut written = 0;
        while written < out.len() {
            match self.queue.pop() {
                Some(sample) => {
                    out[written] = sample;
                    written += 1;
                }
                None => break,
            }
        }
        written
    }

    /// Discard everything buffered
    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get current buffer length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Samples dropped because the ring was full, since creation
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Get fill level as a fraction
    pub fn fill_level(&self) -> f32 {
        self.len() as f32 / self.capacity() as f32
    }
}

/// Thread-safe handle to a sample ring
pub type SharedSampleRing = Arc<SampleRing>;

/// Create a new shared sample ring
pub fn create_shared_ring(capacity: usize) -> SharedSampleRing {
    Arc::new(SampleRing::new(capacity))
}
