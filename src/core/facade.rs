/*!
Crypto facade.

Single public entry point composing the registries, circuit breakers,
worker pool, batcher, memory pool and fallback wrapper. Every operation
resolves an algorithm, runs breaker-guarded on the worker pool and records
a metric. When the always-available software backend supports the
algorithm, the call is wrapped by the fallback guarantee so a failing
primary degrades instead of erroring out.
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::core::batch::{BatchOpKind, BatchOutput, BatchPayload, BatchPriority, OperationBatcher};
use crate::core::breaker::BreakerMap;
use crate::core::config::OrchestratorConfig;
use crate::core::events::{CoreEvent, EventListeners};
use crate::core::fallback::{FallbackGuarantee, FallbackMetrics};
use crate::core::memory::{MemoryPool, PoolMetrics};
use crate::core::metrics::{MetricsRing, OperationMetrics};
use crate::core::provider::{Provider, SoftwareProvider};
use crate::core::registry::{AlgorithmRegistry, ProviderRegistry, ResolvedAlgorithm};
use crate::core::types::{
    AlgorithmIdentifier, AlgorithmMetadata, AlgorithmType, EncapsulationResult, KeyPair,
    PrivateKey, PublicKey, SignatureBytes,
};
use crate::core::workers::{CryptoWorkerPool, WorkerMetrics};
use crate::error::{Error, Result};

/// Combined observability snapshot
#[derive(Debug, Clone)]
pub struct FacadeMetrics {
    /// Recent operations, oldest first
    pub operations: Vec<OperationMetrics>,
    /// Worker pool counters
    pub workers: WorkerMetrics,
    /// Memory pool counters
    pub pool: PoolMetrics,
    /// Fallback counters
    pub fallback: FallbackMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    operation: &'static str,
    /// Digest over the first 32 bytes of the input key material
    digest: [u8; 32],
    /// Full identifier, so invalidation on hot-swap is exact
    algorithm: AlgorithmIdentifier,
}

impl CacheKey {
    fn for_encapsulate(key_material: &[u8], algorithm: &AlgorithmIdentifier) -> Self {
        let prefix = &key_material[..key_material.len().min(32)];
        let digest: [u8; 32] = Sha256::digest(prefix).into();
        Self {
            operation: "encapsulate",
            digest,
            algorithm: algorithm.clone(),
        }
    }
}

/// Facade over the provider orchestration core
pub struct CryptoFacade {
    config: OrchestratorConfig,
    events: EventListeners,
    algorithms: Arc<AlgorithmRegistry>,
    providers: Arc<ProviderRegistry>,
    breakers: BreakerMap,
    workers: Arc<CryptoWorkerPool>,
    batcher: OperationBatcher,
    pool: Arc<MemoryPool>,
    fallback: FallbackGuarantee,
    secondary: Arc<dyn Provider>,
    metrics: MetricsRing,
    cache: Mutex<HashMap<CacheKey, EncapsulationResult>>,
    destroyed: AtomicBool,
}

impl CryptoFacade {
    /// Create a facade with the given configuration
    pub fn new(config: OrchestratorConfig) -> Self {
        let events = EventListeners::new();
        let algorithms = Arc::new(AlgorithmRegistry::new(events.clone()));
        let providers = Arc::new(ProviderRegistry::new(events.clone()));
        let workers = Arc::new(CryptoWorkerPool::new(config.workers.clone()));
        let pool = Arc::new(MemoryPool::new(config.pool.clone()));
        let batcher = OperationBatcher::new(
            config.batch.clone(),
            algorithms.clone(),
            workers.clone(),
            pool.clone(),
            events.clone(),
        );

        if let Some(default) = &config.default_kem {
            algorithms.set_default(AlgorithmType::Kem, default.clone());
        }
        if let Some(default) = &config.default_signature {
            algorithms.set_default(AlgorithmType::Signature, default.clone());
        }

        Self {
            breakers: BreakerMap::new(config.breaker.clone()),
            metrics: MetricsRing::new(config.metrics_capacity),
            fallback: FallbackGuarantee::new(events.clone()),
            secondary: Arc::new(SoftwareProvider::new()),
            cache: Mutex::new(HashMap::new()),
            destroyed: AtomicBool::new(false),
            config,
            events,
            algorithms,
            providers,
            workers,
            batcher,
            pool,
        }
    }

    /// Fluent builder for assembling a facade
    pub fn builder() -> CryptoFacadeBuilder {
        CryptoFacadeBuilder::new()
    }

    /// Algorithm registry handle
    pub fn algorithms(&self) -> &Arc<AlgorithmRegistry> {
        &self.algorithms
    }

    /// Provider registry handle
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Fallback guarantee wrapper handle
    pub fn fallback(&self) -> &FallbackGuarantee {
        &self.fallback
    }

    /// Subscribe to core events
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&CoreEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    /// Register a provider and every algorithm in its capability descriptor
    pub fn register_provider(&self, provider: Arc<dyn Provider>) -> Result<()> {
        self.providers.register(provider)
    }

    /// Register one algorithm backed by a provider
    pub fn register_algorithm(
        &self,
        metadata: AlgorithmMetadata,
        provider: Arc<dyn Provider>,
    ) -> Result<()> {
        self.algorithms.register(metadata, provider)
    }

    fn check_destroyed(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            Err(Error::Destroyed)
        } else {
            Ok(())
        }
    }

    fn resolve(
        &self,
        hint: Option<&AlgorithmIdentifier>,
        algorithm_type: AlgorithmType,
    ) -> Result<ResolvedAlgorithm> {
        match hint {
            Some(hint) => {
                if hint.algorithm_type != algorithm_type {
                    return Err(Error::Validation(format!(
                        "{} is not a {} algorithm",
                        hint, algorithm_type
                    )));
                }
                self.algorithms.get_algorithm(hint)
            }
            None => self.algorithms.get_best_algorithm(algorithm_type),
        }
    }

    /// Breaker-guarded, metrics-recorded execution of one provider call
    async fn execute_guarded<T, F>(
        &self,
        operation: &'static str,
        algorithm: AlgorithmIdentifier,
        task: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.check_destroyed()?;
        self.breakers.check(operation, &algorithm)?;

        let started = Instant::now();
        let outcome = self.workers.run(task).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(_) => self.breakers.record_success(operation, &algorithm),
            Err(_) => {
                if self.breakers.record_failure(operation, &algorithm) {
                    self.events.emit(&CoreEvent::CircuitOpened {
                        operation: operation.to_string(),
                        algorithm: algorithm.name.clone(),
                    });
                }
            }
        }

        let entry = OperationMetrics {
            operation: operation.to_string(),
            algorithm_name: algorithm.name.clone(),
            duration_ms,
            success: outcome.is_ok(),
        };
        self.metrics.record(entry.clone());
        self.events.emit(&CoreEvent::MetricsRecorded(entry));

        outcome
    }

    /// Generate a key pair using the best algorithm of the given kind
    pub async fn generate_key_pair(&self, algorithm_type: AlgorithmType) -> Result<KeyPair> {
        let resolved = self.resolve(None, algorithm_type)?;
        let id = resolved.metadata.identifier.clone();
        let provider = resolved.provider;

        let primary = {
            let id = id.clone();
            self.execute_guarded("generateKeyPair", id.clone(), move || {
                provider.generate_key_pair(&id)
            })
        };

        if self.secondary.supports_algorithm(&id) {
            let secondary = self.secondary.clone();
            let secondary_id = id.clone();
            let secondary_fut = self
                .workers
                .run(move || secondary.generate_key_pair(&secondary_id));
            self.fallback
                .execute_with_fallback("generateKeyPair", &id, primary, secondary_fut)
                .await
        } else {
            primary.await
        }
    }

    /// Generate several key pairs concurrently
    pub async fn generate_key_pairs(
        &self,
        count: usize,
        algorithm_type: AlgorithmType,
    ) -> Result<Vec<KeyPair>> {
        self.check_destroyed()?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let resolved = self.resolve(None, algorithm_type)?;
        let id = resolved.metadata.identifier.clone();
        self.breakers.check("generateKeyPair", &id)?;

        let started = Instant::now();
        let outcome = self
            .workers
            .batch_generate_key_pairs(resolved.provider, &id, count)
            .await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(_) => self.breakers.record_success("generateKeyPair", &id),
            Err(_) => {
                if self.breakers.record_failure("generateKeyPair", &id) {
                    self.events.emit(&CoreEvent::CircuitOpened {
                        operation: "generateKeyPair".to_string(),
                        algorithm: id.name.clone(),
                    });
                }
            }
        }
        let entry = OperationMetrics {
            operation: "generateKeyPairs".to_string(),
            algorithm_name: id.name.clone(),
            duration_ms,
            success: outcome.is_ok(),
        };
        self.metrics.record(entry.clone());
        self.events.emit(&CoreEvent::MetricsRecorded(entry));

        outcome
    }

    /// Encapsulate a shared secret against a public key
    ///
    /// With no hint the best registered KEM is used. Results may be served
    /// from the optional cache; correctness never depends on it.
    pub async fn encapsulate(
        &self,
        public_key: &PublicKey,
        hint: Option<&AlgorithmIdentifier>,
    ) -> Result<EncapsulationResult> {
        let resolved = self.resolve(hint, AlgorithmType::Kem)?;
        let id = resolved.metadata.identifier.clone();

        let cache_key = CacheKey::for_encapsulate(&public_key.bytes, &id);
        if self.config.cache.enabled {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(&cache_key) {
                debug!("encapsulation cache hit for {}", id);
                return Ok(hit.clone());
            }
        }

        let provider = resolved.provider;
        let primary = {
            let id = id.clone();
            let public_key = public_key.clone();
            self.execute_guarded("encapsulate", id.clone(), move || {
                provider.encapsulate(&public_key, &id)
            })
        };

        let result = if self.secondary.supports_algorithm(&id) {
            let secondary = self.secondary.clone();
            let secondary_id = id.clone();
            let secondary_key = public_key.clone();
            let secondary_fut = self
                .workers
                .run(move || secondary.encapsulate(&secondary_key, &secondary_id));
            self.fallback
                .execute_with_fallback("encapsulate", &id, primary, secondary_fut)
                .await?
        } else {
            primary.await?
        };

        if self.config.cache.enabled {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if cache.len() >= self.config.cache.max_entries {
                cache.clear();
            }
            cache.insert(cache_key, result.clone());
        }
        Ok(result)
    }

    /// Recover the shared secret from a ciphertext
    pub async fn decapsulate(
        &self,
        private_key: &PrivateKey,
        ciphertext: &[u8],
        hint: Option<&AlgorithmIdentifier>,
    ) -> Result<Vec<u8>> {
        let resolved = self.resolve(hint, AlgorithmType::Kem)?;
        let id = resolved.metadata.identifier.clone();
        let provider = resolved.provider;

        // One wiped-on-drop copy per executor; nothing outlives the call
        let primary = {
            let id = id.clone();
            let key = private_key.clone();
            let ciphertext = ciphertext.to_vec();
            self.execute_guarded("decapsulate", id.clone(), move || {
                provider.decapsulate(&key, &ciphertext, &id)
            })
        };

        if self.secondary.supports_algorithm(&id) {
            let secondary = self.secondary.clone();
            let secondary_id = id.clone();
            let key = private_key.clone();
            let ciphertext = ciphertext.to_vec();
            let secondary_fut = self
                .workers
                .run(move || secondary.decapsulate(&key, &ciphertext, &secondary_id));
            self.fallback
                .execute_with_fallback("decapsulate", &id, primary, secondary_fut)
                .await
        } else {
            primary.await
        }
    }

    /// Sign data with a private key
    pub async fn sign(
        &self,
        data: &[u8],
        private_key: &PrivateKey,
        hint: Option<&AlgorithmIdentifier>,
    ) -> Result<SignatureBytes> {
        let resolved = self.resolve(hint, AlgorithmType::Signature)?;
        let id = resolved.metadata.identifier.clone();
        let provider = resolved.provider;

        let primary = {
            let id = id.clone();
            let key = private_key.clone();
            let data = data.to_vec();
            self.execute_guarded("sign", id.clone(), move || {
                provider.sign(&data, &key, &id)
            })
        };

        if self.secondary.supports_algorithm(&id) {
            let secondary = self.secondary.clone();
            let secondary_id = id.clone();
            let key = private_key.clone();
            let data = data.to_vec();
            let secondary_fut = self
                .workers
                .run(move || secondary.sign(&data, &key, &secondary_id));
            self.fallback
                .execute_with_fallback("sign", &id, primary, secondary_fut)
                .await
        } else {
            primary.await
        }
    }

    /// Verify a detached signature
    pub async fn verify(
        &self,
        data: &[u8],
        signature: &SignatureBytes,
        public_key: &PublicKey,
        hint: Option<&AlgorithmIdentifier>,
    ) -> Result<bool> {
        let resolved = self.resolve(hint, AlgorithmType::Signature)?;
        let id = resolved.metadata.identifier.clone();
        let provider = resolved.provider;

        let primary = {
            let id = id.clone();
            let data = data.to_vec();
            let signature = signature.clone();
            let public_key = public_key.clone();
            self.execute_guarded("verify", id.clone(), move || {
                provider.verify(&data, &signature, &public_key, &id)
            })
        };

        if self.secondary.supports_algorithm(&id) {
            let secondary = self.secondary.clone();
            let secondary_id = id.clone();
            let data = data.to_vec();
            let signature = signature.clone();
            let public_key = public_key.clone();
            let secondary_fut = self
                .workers
                .run(move || secondary.verify(&data, &signature, &public_key, &secondary_id));
            self.fallback
                .execute_with_fallback("verify", &id, primary, secondary_fut)
                .await
        } else {
            primary.await
        }
    }

    /// Enqueue a key generation into the batcher
    pub async fn generate_key_pair_batched(
        &self,
        algorithm_type: AlgorithmType,
        priority: BatchPriority,
    ) -> Result<KeyPair> {
        self.check_destroyed()?;
        let resolved = self.resolve(None, algorithm_type)?;
        let output = self
            .batcher
            .add_to_batch(
                BatchOpKind::GenerateKeyPair,
                resolved.metadata.identifier.clone(),
                BatchPayload::GenerateKeyPair,
                priority,
            )
            .await?;
        match output {
            BatchOutput::KeyPair(pair) => Ok(pair),
            BatchOutput::Encapsulation(_) => {
                Err(Error::BatchExecution("unexpected batch output".into()))
            }
        }
    }

    /// Enqueue an encapsulation into the batcher
    pub async fn encapsulate_batched(
        &self,
        public_key: &PublicKey,
        hint: Option<&AlgorithmIdentifier>,
        priority: BatchPriority,
    ) -> Result<EncapsulationResult> {
        self.check_destroyed()?;
        let resolved = self.resolve(hint, AlgorithmType::Kem)?;
        let output = self
            .batcher
            .add_to_batch(
                BatchOpKind::Encapsulate,
                resolved.metadata.identifier.clone(),
                BatchPayload::Encapsulate(public_key.clone()),
                priority,
            )
            .await?;
        match output {
            BatchOutput::Encapsulation(result) => Ok(result),
            BatchOutput::KeyPair(_) => {
                Err(Error::BatchExecution("unexpected batch output".into()))
            }
        }
    }

    /// Replace the provider behind an algorithm without downtime
    ///
    /// Resets the algorithm's circuit breakers and invalidates cached
    /// encapsulations keyed by the exact identifier.
    pub async fn hot_swap_algorithm(
        &self,
        id: &AlgorithmIdentifier,
        provider: Arc<dyn Provider>,
    ) -> Result<()> {
        self.check_destroyed()?;
        self.algorithms.hot_swap(id, provider)?;
        self.breakers.reset_matching(id);

        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.retain(|key, _| &key.algorithm != id);
        }
        info!("hot swap of {} complete", id);
        Ok(())
    }

    /// Permanently route all fallback-wrapped calls to the software backend
    pub fn emergency_shutdown<S: Into<String>>(&self, reason: S) {
        self.fallback.emergency_shutdown(reason);
    }

    /// Combined metrics snapshot
    pub fn get_metrics(&self) -> FacadeMetrics {
        FacadeMetrics {
            operations: self.metrics.snapshot(),
            workers: self.workers.metrics(),
            pool: self.pool.metrics(),
            fallback: self.fallback.metrics(),
        }
    }

    /// Drop all cached encapsulation results
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.clear();
        drop(cache);
        self.events.emit(&CoreEvent::CacheCleared);
    }

    /// Tear down the facade
    ///
    /// Idempotent. Pending batch entries are rejected exactly once with a
    /// destroyed error; in-flight provider calls run to completion.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.batcher.destroy();
        self.workers.destroy();
        self.pool.cleanup();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.clear();
        info!("crypto facade destroyed");
    }
}

/// Fluent builder for [`CryptoFacade`]
pub struct CryptoFacadeBuilder {
    config: OrchestratorConfig,
    providers: Vec<Arc<dyn Provider>>,
    algorithms: Vec<(AlgorithmMetadata, Arc<dyn Provider>)>,
}

impl CryptoFacadeBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::new(),
            providers: Vec::new(),
            algorithms: Vec::new(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a provider on build
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Register an algorithm backed by a provider on build
    pub fn with_algorithm(
        mut self,
        metadata: AlgorithmMetadata,
        provider: Arc<dyn Provider>,
    ) -> Self {
        self.algorithms.push((metadata, provider));
        self
    }

    /// Set the preferred KEM algorithm
    pub fn with_default_kem(mut self, id: AlgorithmIdentifier) -> Self {
        self.config.default_kem = Some(id);
        self
    }

    /// Set the preferred signature algorithm
    pub fn with_default_signature(mut self, id: AlgorithmIdentifier) -> Self {
        self.config.default_signature = Some(id);
        self
    }

    /// Build the facade, registering every configured provider and algorithm
    pub fn build(self) -> Result<CryptoFacade> {
        let facade = CryptoFacade::new(self.config);
        for provider in self.providers {
            facade.register_provider(provider)?;
        }
        for (metadata, provider) in self.algorithms {
            facade.register_algorithm(metadata, provider)?;
        }
        Ok(facade)
    }
}

impl Default for CryptoFacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
