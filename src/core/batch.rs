/*!
Operation batcher.

Coalesces independent requests into one underlying dispatch per
(operation, algorithm) key. A batch flushes when it reaches the size cap,
when it holds enough entries including a high-priority one, or when the
window timer started at the first enqueue fires. The size trigger and the
timer race, and whichever fires first cancels the other. Members complete
independently unless the provider's batch call fails atomically.
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::core::config::BatchConfig;
use crate::core::events::{CoreEvent, EventListeners};
use crate::core::memory::MemoryPool;
use crate::core::registry::AlgorithmRegistry;
use crate::core::types::{AlgorithmIdentifier, EncapsulationResult, KeyPair, PublicKey};
use crate::core::workers::CryptoWorkerPool;
use crate::error::{Error, Result};

/// Scheduling priority of a batched operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPriority {
    /// Flushes a batch early once enough entries are pending
    High,
    /// Default priority
    Medium,
    /// Runs last within a batch
    Low,
}

impl BatchPriority {
    fn rank(self) -> u8 {
        match self {
            BatchPriority::High => 2,
            BatchPriority::Medium => 1,
            BatchPriority::Low => 0,
        }
    }
}

/// Kind of operation a batch groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOpKind {
    /// Key pair generation
    GenerateKeyPair,
    /// KEM encapsulation
    Encapsulate,
}

impl BatchOpKind {
    fn name(self) -> &'static str {
        match self {
            BatchOpKind::GenerateKeyPair => "generateKeyPair",
            BatchOpKind::Encapsulate => "encapsulate",
        }
    }
}

/// Input of one batched operation
#[derive(Debug)]
pub enum BatchPayload {
    /// No input beyond the algorithm
    GenerateKeyPair,
    /// Public key to encapsulate against
    Encapsulate(PublicKey),
}

/// Output of one batched operation
#[derive(Debug)]
pub enum BatchOutput {
    /// Result of a generation entry
    KeyPair(KeyPair),
    /// Result of an encapsulation entry
    Encapsulation(EncapsulationResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BatchKey {
    kind: BatchOpKind,
    algorithm: AlgorithmIdentifier,
}

impl BatchKey {
    fn label(&self) -> String {
        format!("{}:{}", self.kind.name(), self.algorithm.name)
    }
}

struct BatchEntry {
    seq: u64,
    priority: BatchPriority,
    payload: BatchPayload,
    tx: oneshot::Sender<Result<BatchOutput>>,
}

struct PendingBatch {
    entries: Vec<BatchEntry>,
    timer: JoinHandle<()>,
}

struct BatcherShared {
    pending: Mutex<HashMap<BatchKey, PendingBatch>>,
    config: BatchConfig,
    registry: Arc<AlgorithmRegistry>,
    workers: Arc<CryptoWorkerPool>,
    pool: Arc<MemoryPool>,
    events: EventListeners,
    destroyed: AtomicBool,
    next_seq: AtomicU64,
}

/// Coalesces operations per (operation, algorithm) key
pub struct OperationBatcher {
    shared: Arc<BatcherShared>,
}

impl OperationBatcher {
    /// Create a batcher dispatching through the given registry and workers
    pub fn new(
        config: BatchConfig,
        registry: Arc<AlgorithmRegistry>,
        workers: Arc<CryptoWorkerPool>,
        pool: Arc<MemoryPool>,
        events: EventListeners,
    ) -> Self {
        Self {
            shared: Arc::new(BatcherShared {
                pending: Mutex::new(HashMap::new()),
                config,
                registry,
                workers,
                pool,
                events,
                destroyed: AtomicBool::new(false),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue an operation and await its individual completion
    pub async fn add_to_batch(
        &self,
        kind: BatchOpKind,
        algorithm: AlgorithmIdentifier,
        payload: BatchPayload,
        priority: BatchPriority,
    ) -> Result<BatchOutput> {
        let rx = self.shared.clone().submit(kind, algorithm, payload, priority)?;
        rx.await
            .map_err(|_| Error::BatchExecution("batch dropped before completion".into()))?
    }

    /// Number of operations waiting in unflushed batches
    pub fn pending_len(&self) -> usize {
        let pending = self.shared.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.values().map(|batch| batch.entries.len()).sum()
    }

    /// Abort batch formation and reject all pending entries
    ///
    /// Idempotent: later calls and later submissions fail with a
    /// destroyed error; each pending entry is rejected exactly once.
    pub fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained: Vec<PendingBatch> = {
            let mut pending = self.shared.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain().map(|(_, batch)| batch).collect()
        };
        for batch in drained {
            batch.timer.abort();
            for entry in batch.entries {
                let _ = entry.tx.send(Err(Error::Destroyed));
            }
        }
    }
}

impl BatcherShared {
    fn submit(
        self: Arc<Self>,
        kind: BatchOpKind,
        algorithm: AlgorithmIdentifier,
        payload: BatchPayload,
        priority: BatchPriority,
    ) -> Result<oneshot::Receiver<Result<BatchOutput>>> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }

        let key = BatchKey { kind, algorithm };
        let (tx, rx) = oneshot::channel();
        let entry = BatchEntry {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            priority,
            payload,
            tx,
        };

        let ready = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            let batch = pending.entry(key.clone()).or_insert_with(|| {
                let shared = self.clone();
                let timer_key = key.clone();
                let window = self.config.window;
                PendingBatch {
                    entries: Vec::new(),
                    timer: tokio::spawn(async move {
                        tokio::time::sleep(window).await;
                        shared.flush(&timer_key, "window elapsed");
                    }),
                }
            });
            batch.entries.push(entry);

            let size = batch.entries.len();
            let has_high = batch
                .entries
                .iter()
                .any(|entry| entry.priority == BatchPriority::High);
            size >= self.config.max_batch_size
                || (size >= self.config.high_priority_threshold && has_high)
        };

        if ready {
            self.flush(&key, "size trigger");
        }
        Ok(rx)
    }

    /// Remove the batch for `key` and dispatch it; cancels the timer so the
    /// size trigger and the window race cleanly
    fn flush(self: &Arc<Self>, key: &BatchKey, cause: &str) {
        let batch = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.remove(key)
        };
        let Some(batch) = batch else {
            // Already flushed by the competing trigger
            return;
        };
        batch.timer.abort();

        debug!(
            "flushing batch {} ({} entries, {})",
            key.label(),
            batch.entries.len(),
            cause
        );

        let mut entries = batch.entries;
        entries.sort_by_key(|entry| (std::cmp::Reverse(entry.priority.rank()), entry.seq));

        let shared = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            shared.run_batch(key, entries).await;
        });
    }

    async fn run_batch(self: Arc<Self>, key: BatchKey, entries: Vec<BatchEntry>) {
        let size = entries.len();
        let resolved = match self.registry.get_algorithm(&key.algorithm) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("batch {} failed to resolve algorithm: {}", key.label(), e);
                self.events.emit(&CoreEvent::BatchFailed {
                    key: key.label(),
                    error: e.to_string(),
                });
                for entry in entries {
                    let _ = entry.tx.send(Err(e.clone()));
                }
                return;
            }
        };

        let provider = resolved.provider;
        let algorithm = resolved.metadata.identifier.clone();
        let atomic_failure = match key.kind {
            BatchOpKind::GenerateKeyPair => {
                self.run_generate(provider, &algorithm, entries).await
            }
            BatchOpKind::Encapsulate => {
                self.run_encapsulate(provider, &algorithm, entries).await
            }
        };

        match atomic_failure {
            None => self.events.emit(&CoreEvent::BatchCompleted {
                key: key.label(),
                size,
            }),
            Some(error) => self.events.emit(&CoreEvent::BatchFailed {
                key: key.label(),
                error,
            }),
        }
    }

    /// Returns the error message when the provider's batch call failed
    /// atomically for all members
    async fn run_generate(
        &self,
        provider: Arc<dyn crate::core::provider::Provider>,
        algorithm: &AlgorithmIdentifier,
        entries: Vec<BatchEntry>,
    ) -> Option<String> {
        if provider.supports_batch_operations() {
            let count = entries.len();
            let result = self
                .workers
                .batch_generate_key_pairs(provider, algorithm, count)
                .await;
            return match result {
                Ok(pairs) => {
                    for (entry, pair) in entries.into_iter().zip(pairs) {
                        let _ = entry.tx.send(Ok(BatchOutput::KeyPair(pair)));
                    }
                    None
                }
                Err(e) => {
                    let message = e.to_string();
                    let failure = Error::BatchExecution(message.clone());
                    for entry in entries {
                        let _ = entry.tx.send(Err(failure.clone()));
                    }
                    Some(message)
                }
            };
        }

        // No native batch call: members run concurrently and fail alone
        let mut join_set = tokio::task::JoinSet::new();
        for entry in entries {
            let workers = self.workers.clone();
            let provider = provider.clone();
            let algorithm = algorithm.clone();
            join_set.spawn(async move {
                let result = workers.generate_key_pair(provider, &algorithm).await;
                let _ = entry.tx.send(result.map(BatchOutput::KeyPair));
            });
        }
        while join_set.join_next().await.is_some() {}
        None
    }

    async fn run_encapsulate(
        &self,
        provider: Arc<dyn crate::core::provider::Provider>,
        algorithm: &AlgorithmIdentifier,
        entries: Vec<BatchEntry>,
    ) -> Option<String> {
        if provider.supports_batch_operations() {
            // Stage each key through pool buffers; the provider call reads
            // them and the closure hands them back for recycling
            let mut keys = Vec::with_capacity(entries.len());
            for entry in &entries {
                if let BatchPayload::Encapsulate(pk) = &entry.payload {
                    let mut staged = self.pool.allocate(pk.bytes.len());
                    staged.extend_from_slice(&pk.bytes);
                    keys.push(PublicKey::new(pk.algorithm.clone(), staged));
                }
            }

            let call_algorithm = algorithm.clone();
            let outcome = self
                .workers
                .run(move || Ok((provider.batch_encapsulate(&keys, &call_algorithm), keys)))
                .await;

            let result = match outcome {
                Ok((result, keys)) => {
                    for key in keys {
                        self.pool.deallocate(key.bytes);
                    }
                    result
                }
                Err(e) => Err(e),
            };

            return match result {
                Ok(results) => {
                    for (entry, encapsulation) in entries.into_iter().zip(results) {
                        let _ = entry.tx.send(Ok(BatchOutput::Encapsulation(encapsulation)));
                    }
                    None
                }
                Err(e) => {
                    let message = e.to_string();
                    let failure = Error::BatchExecution(message.clone());
                    for entry in entries {
                        let _ = entry.tx.send(Err(failure.clone()));
                    }
                    Some(message)
                }
            };
        }

        let mut join_set = tokio::task::JoinSet::new();
        for entry in entries {
            let workers = self.workers.clone();
            let provider = provider.clone();
            let algorithm = algorithm.clone();
            join_set.spawn(async move {
                let result = match entry.payload {
                    BatchPayload::Encapsulate(pk) => {
                        workers.encapsulate(provider, pk, &algorithm).await
                    }
                    BatchPayload::GenerateKeyPair => Err(Error::Validation(
                        "generation payload in an encapsulation batch".into(),
                    )),
                };
                let _ = entry.tx.send(result.map(BatchOutput::Encapsulation));
            });
        }
        while join_set.join_next().await.is_some() {}
        None
    }
}

impl Drop for OperationBatcher {
    fn drop(&mut self) {
        self.destroy();
    }
}
