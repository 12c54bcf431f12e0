/*!
Algorithm registry.

Tracks which (algorithm, version) pairs are registered and which provider
backs each, resolves compatible versions, scores candidates for
best-algorithm selection, and hot-swaps a provider behind a registered
algorithm without disturbing in-flight calls.
*/

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info, warn};

use crate::core::events::{CoreEvent, EventListeners};
use crate::core::provider::Provider;
use crate::core::types::{AlgorithmIdentifier, AlgorithmMetadata, AlgorithmType};
use crate::error::{Error, Result};

/// Externally supplied key-material transform between two algorithms
pub type MigrationFn = dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync;

/// One registered algorithm and its backing provider
struct RegisteredAlgorithm {
    metadata: AlgorithmMetadata,
    /// Shared, not owned: one provider may back several algorithms
    provider: Arc<dyn Provider>,
    enabled: bool,
    usage_count: u64,
}

/// Resolution result: the metadata/provider pair a caller executes against
///
/// The provider handle is captured at lookup time, so an operation holding
/// one completes against it even if a hot-swap lands mid-flight.
#[derive(Clone)]
pub struct ResolvedAlgorithm {
    /// Metadata of the resolved algorithm
    pub metadata: AlgorithmMetadata,
    /// Provider captured for this call
    pub provider: Arc<dyn Provider>,
}

/// Registry of algorithms and their providers
pub struct AlgorithmRegistry {
    algorithms: RwLock<HashMap<AlgorithmIdentifier, RegisteredAlgorithm>>,
    migrations: RwLock<HashMap<(AlgorithmIdentifier, AlgorithmIdentifier), Arc<MigrationFn>>>,
    defaults: RwLock<HashMap<AlgorithmType, AlgorithmIdentifier>>,
    events: EventListeners,
}

impl AlgorithmRegistry {
    /// Create an empty registry emitting events on the given listener list
    pub fn new(events: EventListeners) -> Self {
        Self {
            algorithms: RwLock::new(HashMap::new()),
            migrations: RwLock::new(HashMap::new()),
            defaults: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Register an algorithm backed by a provider
    ///
    /// Fails if the provider does not declare support for the algorithm,
    /// is unavailable, fails to initialize, or the exact identifier is
    /// already registered.
    pub fn register(
        &self,
        metadata: AlgorithmMetadata,
        provider: Arc<dyn Provider>,
    ) -> Result<()> {
        let id = metadata.identifier.clone();
        if !provider.supports_algorithm(&id) {
            return Err(Error::Validation(format!(
                "provider '{}' does not support {}",
                provider.name(),
                id
            )));
        }
        if !provider.is_available() {
            return Err(Error::ProviderUnavailable(format!(
                "provider '{}' is not available",
                provider.name()
            )));
        }
        provider.initialize().map_err(|e| {
            Error::ProviderUnavailable(format!(
                "provider '{}' failed to initialize: {}",
                provider.name(),
                e
            ))
        })?;

        let provider_name = provider.name().to_string();
        {
            let mut algorithms = self.algorithms.write().unwrap_or_else(|e| e.into_inner());
            if algorithms.contains_key(&id) {
                return Err(Error::Validation(format!("{} is already registered", id)));
            }
            algorithms.insert(
                id.clone(),
                RegisteredAlgorithm {
                    metadata,
                    provider,
                    enabled: true,
                    usage_count: 0,
                },
            );
        }

        info!("registered {} via provider '{}'", id, provider_name);
        self.events.emit(&CoreEvent::AlgorithmRegistered {
            id,
            provider: provider_name,
        });
        Ok(())
    }

    /// Remove an algorithm from the registry
    pub fn unregister(&self, id: &AlgorithmIdentifier) -> Result<()> {
        let removed = {
            let mut algorithms = self.algorithms.write().unwrap_or_else(|e| e.into_inner());
            algorithms.remove(id)
        };
        match removed {
            Some(_) => {
                info!("unregistered {}", id);
                self.events
                    .emit(&CoreEvent::AlgorithmUnregistered { id: id.clone() });
                Ok(())
            }
            None => Err(Error::AlgorithmNotFound(id.to_string())),
        }
    }

    /// Resolve an algorithm by exact identifier, falling back to the best
    /// compatible version (same name, type and major; highest minor/patch)
    ///
    /// Every successful resolution increments the algorithm's usage counter.
    pub fn get_algorithm(&self, id: &AlgorithmIdentifier) -> Result<ResolvedAlgorithm> {
        let mut algorithms = self.algorithms.write().unwrap_or_else(|e| e.into_inner());

        let resolved_id = if algorithms.contains_key(id) {
            Some(id.clone())
        } else {
            Self::find_compatible_version(&algorithms, id)
        };

        match resolved_id {
            Some(resolved_id) => {
                let entry = algorithms
                    .get_mut(&resolved_id)
                    .ok_or_else(|| Error::AlgorithmNotFound(id.to_string()))?;
                entry.usage_count += 1;
                Ok(ResolvedAlgorithm {
                    metadata: entry.metadata.clone(),
                    provider: entry.provider.clone(),
                })
            }
            None => Err(Error::AlgorithmNotFound(id.to_string())),
        }
    }

    fn find_compatible_version(
        algorithms: &HashMap<AlgorithmIdentifier, RegisteredAlgorithm>,
        id: &AlgorithmIdentifier,
    ) -> Option<AlgorithmIdentifier> {
        algorithms
            .keys()
            .filter(|candidate| candidate.is_compatible_with(id))
            .max_by_key(|candidate| (candidate.version.minor, candidate.version.patch))
            .cloned()
    }

    /// Resolve the best algorithm of a primitive kind
    ///
    /// A configured default wins when it resolves; otherwise all enabled
    /// algorithms of the type are scored and the maximum wins, ties broken
    /// by name so the choice is deterministic for a fixed registry state.
    pub fn get_best_algorithm(&self, algorithm_type: AlgorithmType) -> Result<ResolvedAlgorithm> {
        let default_id = {
            let defaults = self.defaults.read().unwrap_or_else(|e| e.into_inner());
            defaults.get(&algorithm_type).cloned()
        };
        if let Some(default_id) = default_id {
            if let Ok(resolved) = self.get_algorithm(&default_id) {
                return Ok(resolved);
            }
            debug!(
                "configured default {} not resolvable, scoring candidates",
                default_id
            );
        }

        let best_id = {
            let algorithms = self.algorithms.read().unwrap_or_else(|e| e.into_inner());
            algorithms
                .values()
                .filter(|entry| {
                    entry.enabled && entry.metadata.identifier.algorithm_type == algorithm_type
                })
                .max_by_key(|entry| {
                    (
                        entry.metadata.capabilities.score(),
                        std::cmp::Reverse(entry.metadata.identifier.name.clone()),
                    )
                })
                .map(|entry| entry.metadata.identifier.clone())
        };

        match best_id {
            Some(id) => self.get_algorithm(&id),
            None => Err(Error::AlgorithmNotFound(format!(
                "no enabled {} algorithm registered",
                algorithm_type
            ))),
        }
    }

    /// Configure the preferred algorithm for a primitive kind
    pub fn set_default(&self, algorithm_type: AlgorithmType, id: AlgorithmIdentifier) {
        let mut defaults = self.defaults.write().unwrap_or_else(|e| e.into_inner());
        defaults.insert(algorithm_type, id);
    }

    /// Enable or disable an algorithm for best-algorithm selection
    pub fn set_enabled(&self, id: &AlgorithmIdentifier, enabled: bool) -> Result<()> {
        let usage_count = {
            let mut algorithms = self.algorithms.write().unwrap_or_else(|e| e.into_inner());
            let entry = algorithms
                .get_mut(id)
                .ok_or_else(|| Error::AlgorithmNotFound(id.to_string()))?;
            entry.enabled = enabled;
            entry.usage_count
        };
        self.events.emit(&CoreEvent::AlgorithmStatus {
            id: id.clone(),
            enabled,
            usage_count,
        });
        Ok(())
    }

    /// Replace the provider behind a registered algorithm
    ///
    /// The swap is atomic with respect to in-flight calls: they either
    /// captured the old provider handle at resolution time or see the new
    /// one on their next lookup. On any validation or initialization
    /// failure the previous binding is left fully intact. The old provider
    /// is destroyed only when no other registered algorithm references it.
    pub fn hot_swap(
        &self,
        id: &AlgorithmIdentifier,
        new_provider: Arc<dyn Provider>,
    ) -> Result<()> {
        if !new_provider.supports_algorithm(id) {
            return Err(Error::Validation(format!(
                "provider '{}' does not support {}",
                new_provider.name(),
                id
            )));
        }
        if !new_provider.is_available() {
            return Err(Error::ProviderUnavailable(format!(
                "provider '{}' is not available",
                new_provider.name()
            )));
        }
        new_provider.initialize().map_err(|e| {
            Error::ProviderUnavailable(format!(
                "provider '{}' failed to initialize: {}",
                new_provider.name(),
                e
            ))
        })?;

        let new_name = new_provider.name().to_string();
        let old_provider = {
            let mut algorithms = self.algorithms.write().unwrap_or_else(|e| e.into_inner());
            let entry = algorithms
                .get_mut(id)
                .ok_or_else(|| Error::AlgorithmNotFound(id.to_string()))?;
            let old = std::mem::replace(&mut entry.provider, new_provider);

            let still_referenced = algorithms
                .iter()
                .any(|(other_id, other)| other_id != id && Arc::ptr_eq(&other.provider, &old));
            if still_referenced { None } else { Some(old) }
        };

        if let Some(old) = old_provider {
            if let Err(e) = old.destroy() {
                warn!("failed to destroy provider '{}': {}", old.name(), e);
            }
        }

        info!("hot-swapped {} to provider '{}'", id, new_name);
        self.events.emit(&CoreEvent::AlgorithmSwapped {
            id: id.clone(),
            provider: new_name,
        });
        Ok(())
    }

    /// Associate a key-material transform between two algorithms
    pub fn register_migration(
        &self,
        from: AlgorithmIdentifier,
        to: AlgorithmIdentifier,
        transform: Arc<MigrationFn>,
    ) {
        let mut migrations = self.migrations.write().unwrap_or_else(|e| e.into_inner());
        migrations.insert((from, to), transform);
    }

    /// Look up a registered migration transform
    pub fn get_migration(
        &self,
        from: &AlgorithmIdentifier,
        to: &AlgorithmIdentifier,
    ) -> Option<Arc<MigrationFn>> {
        let migrations = self.migrations.read().unwrap_or_else(|e| e.into_inner());
        migrations.get(&(from.clone(), to.clone())).cloned()
    }

    /// Metadata for every registered algorithm
    pub fn list(&self) -> Vec<AlgorithmMetadata> {
        let algorithms = self.algorithms.read().unwrap_or_else(|e| e.into_inner());
        algorithms.values().map(|entry| entry.metadata.clone()).collect()
    }

    /// Lookups served for an algorithm so far (analytics only)
    pub fn usage_count(&self, id: &AlgorithmIdentifier) -> Option<u64> {
        let algorithms = self.algorithms.read().unwrap_or_else(|e| e.into_inner());
        algorithms.get(id).map(|entry| entry.usage_count)
    }
}
