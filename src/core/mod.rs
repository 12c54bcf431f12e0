/*!
Core orchestration components.

Everything the facade composes lives here: identity and key types, the
provider contract and software backend, the two registries, circuit
breakers, the memory pool, the worker pool, the operation batcher, the
fallback wrapper, events, metrics and configuration.
*/

pub mod batch;
pub mod breaker;
pub mod config;
pub mod events;
pub mod facade;
pub mod fallback;
pub mod memory;
pub mod metrics;
pub mod provider;
pub mod registry;
pub mod types;
pub mod workers;

pub use batch::{BatchPriority, OperationBatcher};
pub use breaker::{BreakerState, CircuitBreaker};
pub use config::{
    BatchConfig, BreakerConfig, CacheConfig, OrchestratorConfig, PoolConfig, WorkerConfig,
};
pub use events::{CoreEvent, EventListeners};
pub use facade::{CryptoFacade, CryptoFacadeBuilder, FacadeMetrics};
pub use fallback::{FallbackGuarantee, FallbackMetrics};
pub use memory::{MemoryPool, PoolMetrics};
pub use metrics::{MetricsRing, OperationMetrics};
pub use provider::{Provider, SoftwareProvider};
pub use registry::{AlgorithmRegistry, ProviderRegistry, ProviderStatus, ResolvedAlgorithm};
pub use types::{
    AlgorithmCapabilities, AlgorithmIdentifier, AlgorithmMetadata, AlgorithmType,
    AlgorithmVersion, CryptoCapabilities, EncapsulationResult, KeyPair, PerformanceProfile,
    PrivateKey, PublicKey, SignatureBytes,
};
pub use workers::{CryptoWorkerPool, WorkerMetrics};
