/*!
Memory reuse layer.
*/

pub mod pool;

pub use pool::{MemoryPool, PoolMetrics};
