//! Reusable working buffers shared across runs.

use crossbeam_queue::ArrayQueue;

use crate::types::Vec3;

/// A bounded pool of working buffers.
///
/// A run rents a buffer at launch and gives it back once the results have
/// been copied out, so repeated runs of the same size stop allocating.
#[derive(Debug)]
pub struct BufferPool {
    free: ArrayQueue<Vec<Vec3>>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(4)
    }
}

impl BufferPool {
    /// Creates a pool that retains at most `slots` idle buffers.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            free: ArrayQueue::new(slots.max(1)),
        }
    }

    /// Returns a zeroed buffer of exactly `len` vectors.
    #[must_use]
    pub fn rent(&self, len: usize) -> Vec<Vec3> {
        let mut buffer = self.free.pop().unwrap_or_default();
        buffer.clear();
        buffer.resize(len, Vec3::ZERO);
        buffer
    }

    /// Returns a buffer to the pool. Dropped if the pool is already full.
    pub fn give_back(&self, mut buffer: Vec<Vec3>) {
        buffer.clear();
        let _ = self.free.push(buffer);
    }

    /// Number of idle buffers held.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rent_is_zeroed_and_sized() {
        let pool = BufferPool::new(2);
        let mut buffer = pool.rent(5);
        assert_eq!(buffer.len(), 5);
        buffer[2] = Vec3::new(1.0, 1.0, 1.0);
        pool.give_back(buffer);

        let again = pool.rent(3);
        assert_eq!(again, vec![Vec3::ZERO; 3]);
    }

    #[test]
    fn returned_buffer_is_reused() {
        let pool = BufferPool::new(2);
        let buffer = pool.rent(64);
        let capacity = buffer.capacity();
        pool.give_back(buffer);
        assert_eq!(pool.idle(), 1);

        let again = pool.rent(32);
        assert!(again.capacity() >= capacity);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn pool_retains_bounded_number() {
        let pool = BufferPool::new(1);
        pool.give_back(Vec::new());
        pool.give_back(Vec::new());
        assert_eq!(pool.idle(), 1);
    }
}
