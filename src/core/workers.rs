/*!
Worker pool for CPU-bound provider calls.

Provider math runs on the blocking thread pool, bounded by a semaphore so
batched work executes genuinely concurrently up to the configured width
without starving the runtime. `destroy` closes the semaphore; submissions
after that fail with a destroyed error.
*/

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::config::WorkerConfig;
use crate::core::provider::Provider;
use crate::core::types::{AlgorithmIdentifier, EncapsulationResult, KeyPair, PublicKey};
use crate::error::{Error, Result};

/// Snapshot of worker pool activity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerMetrics {
    /// Tasks that completed, successfully or not
    pub tasks_completed: u64,
    /// Tasks whose provider call failed
    pub tasks_failed: u64,
    /// Average task duration in milliseconds
    pub average_duration_ms: f64,
}

#[derive(Debug, Default)]
struct MetricsState {
    completed: u64,
    failed: u64,
    total_duration_ms: f64,
}

/// Bounded executor for provider operations
pub struct CryptoWorkerPool {
    semaphore: Arc<Semaphore>,
    metrics: Arc<Mutex<MetricsState>>,
}

impl CryptoWorkerPool {
    /// Create a pool with the configured concurrency
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            metrics: Arc::new(Mutex::new(MetricsState::default())),
        }
    }

    /// Run one provider call on the blocking pool, bounded by the semaphore
    pub async fn run<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self::execute(self.semaphore.clone(), self.metrics.clone(), task).await
    }

    async fn execute<T, F>(
        semaphore: Arc<Semaphore>,
        metrics: Arc<Mutex<MetricsState>>,
        task: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| Error::Destroyed)?;

        let started = Instant::now();
        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|e| Error::Provider(format!("worker task failed: {}", e)))?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut state = metrics.lock().unwrap_or_else(|e| e.into_inner());
        state.completed += 1;
        state.total_duration_ms += elapsed_ms;
        if outcome.is_err() {
            state.failed += 1;
        }

        outcome
    }

    /// Generate one key pair on a worker
    pub async fn generate_key_pair(
        &self,
        provider: Arc<dyn Provider>,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<KeyPair> {
        let algorithm = algorithm.clone();
        self.run(move || provider.generate_key_pair(&algorithm)).await
    }

    /// Generate `count` key pairs
    ///
    /// Uses the provider's native batch call when it advertises one,
    /// otherwise fans out individual generations concurrently.
    pub async fn batch_generate_key_pairs(
        &self,
        provider: Arc<dyn Provider>,
        algorithm: &AlgorithmIdentifier,
        count: usize,
    ) -> Result<Vec<KeyPair>> {
        if provider.supports_batch_operations() {
            let algorithm = algorithm.clone();
            return self
                .run(move || provider.batch_generate_key_pairs(&algorithm, count))
                .await;
        }

        let mut join_set = JoinSet::new();
        for index in 0..count {
            let semaphore = self.semaphore.clone();
            let metrics = self.metrics.clone();
            let provider = provider.clone();
            let algorithm = algorithm.clone();
            join_set.spawn(async move {
                let pair =
                    Self::execute(semaphore, metrics, move || provider.generate_key_pair(&algorithm))
                        .await?;
                Ok::<_, Error>((index, pair))
            });
        }

        let mut pairs: Vec<Option<KeyPair>> = (0..count).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, pair) =
                joined.map_err(|e| Error::Provider(format!("worker task failed: {}", e)))??;
            pairs[index] = Some(pair);
        }
        Ok(pairs.into_iter().flatten().collect())
    }

    /// Encapsulate on a worker
    pub async fn encapsulate(
        &self,
        provider: Arc<dyn Provider>,
        public_key: PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<EncapsulationResult> {
        let algorithm = algorithm.clone();
        self.run(move || provider.encapsulate(&public_key, &algorithm))
            .await
    }

    /// Encapsulate against several public keys
    pub async fn batch_encapsulate(
        &self,
        provider: Arc<dyn Provider>,
        public_keys: Vec<PublicKey>,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<EncapsulationResult>> {
        if provider.supports_batch_operations() {
            let algorithm = algorithm.clone();
            return self
                .run(move || provider.batch_encapsulate(&public_keys, &algorithm))
                .await;
        }

        let count = public_keys.len();
        let mut join_set = JoinSet::new();
        for (index, public_key) in public_keys.into_iter().enumerate() {
            let semaphore = self.semaphore.clone();
            let metrics = self.metrics.clone();
            let provider = provider.clone();
            let algorithm = algorithm.clone();
            join_set.spawn(async move {
                let result =
                    Self::execute(semaphore, metrics, move || {
                        provider.encapsulate(&public_key, &algorithm)
                    })
                    .await?;
                Ok::<_, Error>((index, result))
            });
        }

        let mut results: Vec<Option<EncapsulationResult>> = (0..count).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, result) =
                joined.map_err(|e| Error::Provider(format!("worker task failed: {}", e)))??;
            results[index] = Some(result);
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Snapshot of worker activity
    pub fn metrics(&self) -> WorkerMetrics {
        let state = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        let average = if state.completed > 0 {
            state.total_duration_ms / state.completed as f64
        } else {
            0.0
        };
        WorkerMetrics {
            tasks_completed: state.completed,
            tasks_failed: state.failed,
            average_duration_ms: average,
        }
    }

    /// Stop accepting work; in-flight tasks run to completion
    pub fn destroy(&self) {
        self.semaphore.close();
    }
}
