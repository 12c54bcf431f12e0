/*!
# PQC Orchestrator

An in-process orchestration core for post-quantum cryptographic providers.
Multiple backends implementing ML-KEM-768 key encapsulation and ML-DSA-65
signatures register behind a single facade that handles algorithm
resolution, provider selection, failure isolation and throughput shaping.

## Overview

This library provides:

- A versioned algorithm registry with compatible-version resolution,
  capability scoring and zero-downtime provider hot-swap
- A priority-ordered provider registry with availability probing
- Per-(operation, algorithm) circuit breakers with half-open recovery
- A bounded worker pool running provider math off the async runtime
- An operation batcher coalescing key generation and encapsulation by
  size, time window and priority
- A fallback guarantee wrapper backed by an always-available software
  provider, with emergency-shutdown latching
- A reusable buffer pool and ring-buffered operation metrics

## Quick start

```no_run
use std::sync::Arc;
use pqc_orchestrator::{AlgorithmMetadata, AlgorithmType, CryptoFacade, SoftwareProvider};

# async fn run() -> pqc_orchestrator::Result<()> {
let provider = Arc::new(SoftwareProvider::new());
let facade = CryptoFacade::builder()
    .with_provider(provider.clone())
    .with_algorithm(AlgorithmMetadata::ml_kem_768(), provider.clone())
    .with_algorithm(AlgorithmMetadata::ml_dsa_65(), provider)
    .build()?;

let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;
let encap = facade.encapsulate(&pair.public, None).await?;
let secret = facade
    .decapsulate(&pair.private, &encap.ciphertext, None)
    .await?;
assert_eq!(&secret[..], &encap.shared_secret[..]);
# Ok(())
# }
```
*/

// Orchestration components
pub mod core;

// Error types
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Error, Result};

pub use core::facade::{CryptoFacade, CryptoFacadeBuilder, FacadeMetrics};

pub use core::config::{
    BatchConfig, BreakerConfig, CacheConfig, OrchestratorConfig, PoolConfig, WorkerConfig,
};

pub use core::types::{
    AlgorithmCapabilities, AlgorithmIdentifier, AlgorithmMetadata, AlgorithmType,
    AlgorithmVersion, CryptoCapabilities, EncapsulationResult, KeyPair, PerformanceProfile,
    PrivateKey, PublicKey, SignatureBytes,
};

pub use core::provider::{Provider, SoftwareProvider};

pub use core::registry::{AlgorithmRegistry, ProviderRegistry, ProviderStatus, ResolvedAlgorithm};

pub use core::batch::BatchPriority;
pub use core::breaker::BreakerState;
pub use core::events::{CoreEvent, EventListeners};
pub use core::fallback::{FallbackGuarantee, FallbackMetrics};
pub use core::memory::{MemoryPool, PoolMetrics};
pub use core::metrics::OperationMetrics;
pub use core::workers::{CryptoWorkerPool, WorkerMetrics};
