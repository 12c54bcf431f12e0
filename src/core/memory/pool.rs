/*!
Reusable buffer pool.

Allocation prefers the smallest free block that fits over a fresh
allocation. The pool does not zero returned buffers; callers handling
private key material must wipe before deallocating.
*/

use std::sync::Mutex;

use crate::core::config::PoolConfig;

/// Allocation counters for memory metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Buffers handed out
    pub allocations: u64,
    /// Allocations served from the free list
    pub reuses: u64,
    /// Buffers returned to the free list
    pub returns: u64,
}

struct PoolState {
    free: Vec<Vec<u8>>,
    metrics: PoolMetrics,
}

/// Shared pool of reusable byte buffers
pub struct MemoryPool {
    state: Mutex<PoolState>,
    config: PoolConfig,
}

impl MemoryPool {
    /// Create an empty pool
    pub fn new(config: PoolConfig) -> Self {
        Self {
            state: Mutex::new(PoolState {
                free: Vec::new(),
                metrics: PoolMetrics::default(),
            }),
            config,
        }
    }

    /// Get a cleared buffer with capacity of at least `size` bytes
    pub fn allocate(&self, size: usize) -> Vec<u8> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.metrics.allocations += 1;

        // Smallest free block that fits
        let candidate = state
            .free
            .iter()
            .enumerate()
            .filter(|(_, block)| block.capacity() >= size)
            .min_by_key(|(_, block)| block.capacity())
            .map(|(index, _)| index);

        match candidate {
            Some(index) => {
                state.metrics.reuses += 1;
                let mut block = state.free.swap_remove(index);
                block.clear();
                block
            }
            None => Vec::with_capacity(size),
        }
    }

    /// Return a buffer to the free list for reuse
    ///
    /// Oversized blocks and blocks beyond the retention limit are dropped.
    pub fn deallocate(&self, buffer: Vec<u8>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.metrics.returns += 1;
        if buffer.capacity() == 0
            || buffer.capacity() > self.config.max_block_size
            || state.free.len() >= self.config.max_blocks
        {
            return;
        }
        state.free.push(buffer);
    }

    /// Drop all free blocks
    pub fn cleanup(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.free.clear();
        state.free.shrink_to_fit();
    }

    /// Snapshot of the allocation counters
    pub fn metrics(&self) -> PoolMetrics {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).metrics
    }

    /// Number of blocks currently available for reuse
    pub fn free_blocks(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).free.len()
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_returned_buffer() {
        let pool = MemoryPool::default();
        let mut buffer = pool.allocate(128);
        buffer.extend_from_slice(&[1, 2, 3]);
        pool.deallocate(buffer);

        let reused = pool.allocate(64);
        assert!(reused.capacity() >= 64);
        assert!(reused.is_empty());

        let metrics = pool.metrics();
        assert_eq!(metrics.allocations, 2);
        assert_eq!(metrics.reuses, 1);
        assert_eq!(metrics.returns, 1);
    }

    #[test]
    fn test_prefers_smallest_fitting_block() {
        let pool = MemoryPool::default();
        pool.deallocate(Vec::with_capacity(1024));
        pool.deallocate(Vec::with_capacity(64));

        let block = pool.allocate(32);
        assert!(block.capacity() >= 32);
        assert!(block.capacity() < 1024);
    }

    #[test]
    fn test_cleanup_drops_free_blocks() {
        let pool = MemoryPool::default();
        pool.deallocate(Vec::with_capacity(128));
        assert_eq!(pool.free_blocks(), 1);

        pool.cleanup();
        assert_eq!(pool.free_blocks(), 0);
    }

    #[test]
    fn test_retention_limits() {
        let pool = MemoryPool::new(PoolConfig {
            max_blocks: 1,
            max_block_size: 256,
        });
        pool.deallocate(Vec::with_capacity(64));
        pool.deallocate(Vec::with_capacity(64)); // over the block limit
        pool.deallocate(Vec::with_capacity(4096)); // over the size limit
        assert_eq!(pool.free_blocks(), 1);
    }

    #[test]
    fn test_concurrent_allocate_deallocate() {
        use std::sync::Arc;

        let pool = Arc::new(MemoryPool::default());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let buffer = pool.allocate(256);
                    pool.deallocate(buffer);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pool.metrics().allocations, 800);
    }
}
