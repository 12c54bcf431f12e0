/*!
Configuration for the orchestration core.

This module provides the tunables for circuit breaking, batching, worker
concurrency, buffer pooling, caching and metrics retention, with presets
for common deployment profiles.
*/

use std::time::Duration;

use crate::core::types::AlgorithmIdentifier;

/// Circuit breaker tunables
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    pub threshold: u32,
    /// How long an open breaker waits before permitting a half-open trial
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Operation batcher tunables
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Batch executes immediately at this size
    pub max_batch_size: usize,
    /// Window between the first enqueue and a forced flush
    pub window: Duration,
    /// A batch with at least this many entries flushes early when one is
    /// high priority
    pub high_priority_threshold: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            window: Duration::from_millis(50),
            high_priority_threshold: 3,
        }
    }
}

/// Worker pool tunables
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of provider calls running concurrently
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Memory pool tunables
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum free blocks retained for reuse
    pub max_blocks: usize,
    /// Blocks larger than this are dropped instead of pooled
    pub max_block_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_blocks: 64,
            max_block_size: 1 << 20,
        }
    }
}

/// Encapsulation cache tunables
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Caching is an optimization only and is off by default
    pub enabled: bool,
    /// Maximum cached entries before wholesale eviction
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 256,
        }
    }
}

/// Top-level configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Circuit breaker settings
    pub breaker: BreakerConfig,
    /// Batching settings
    pub batch: BatchConfig,
    /// Worker pool settings
    pub workers: WorkerConfig,
    /// Memory pool settings
    pub pool: PoolConfig,
    /// Encapsulation cache settings
    pub cache: CacheConfig,
    /// Capacity of the operation metrics ring
    pub metrics_capacity: usize,
    /// Preferred KEM algorithm, consulted before scoring
    pub default_kem: Option<AlgorithmIdentifier>,
    /// Preferred signature algorithm, consulted before scoring
    pub default_signature: Option<AlgorithmIdentifier>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            batch: BatchConfig::default(),
            workers: WorkerConfig::default(),
            pool: PoolConfig::default(),
            cache: CacheConfig::default(),
            metrics_capacity: 1000,
            default_kem: None,
            default_signature: None,
        }
    }
}

impl OrchestratorConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset favoring small batches and fast breaker recovery
    pub fn low_latency() -> Self {
        Self {
            batch: BatchConfig {
                max_batch_size: 4,
                window: Duration::from_millis(10),
                high_priority_threshold: 2,
            },
            breaker: BreakerConfig {
                threshold: 3,
                reset_timeout: Duration::from_secs(5),
            },
            ..Default::default()
        }
    }

    /// Preset favoring large batches and wide worker concurrency
    pub fn high_throughput() -> Self {
        Self {
            batch: BatchConfig {
                max_batch_size: 32,
                window: Duration::from_millis(100),
                high_priority_threshold: 3,
            },
            workers: WorkerConfig { concurrency: 16 },
            ..Default::default()
        }
    }
}
