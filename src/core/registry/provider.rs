/*!
Provider registry.

Tracks the available providers, orders them by priority, and answers
"who can run algorithm X". Registration probes availability and
initializes the provider; unregistration destroys it best-effort.
*/

use std::sync::{Arc, RwLock};

use log::{info, warn};

use crate::core::events::{CoreEvent, EventListeners};
use crate::core::provider::Provider;
use crate::core::types::{AlgorithmIdentifier, CryptoCapabilities};
use crate::error::{Error, Result};

/// Snapshot of one provider's probed state
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    /// Provider name
    pub name: String,
    /// Result of the availability probe
    pub available: bool,
    /// Selection priority
    pub priority: i32,
    /// Advertised capabilities
    pub capabilities: CryptoCapabilities,
    /// Probe failure, if any
    pub error: Option<String>,
}

struct RegisteredProvider {
    provider: Arc<dyn Provider>,
    /// Registration order, the tie-breaker for equal priorities
    order: u64,
}

/// Registry of providers ordered by priority
pub struct ProviderRegistry {
    providers: RwLock<Vec<RegisteredProvider>>,
    events: EventListeners,
}

impl ProviderRegistry {
    /// Create an empty registry emitting events on the given listener list
    pub fn new(events: EventListeners) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Register a provider
    ///
    /// Requires a passing availability probe, then initializes the
    /// provider. On failure nothing is retained.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Result<()> {
        if !provider.is_available() {
            return Err(Error::ProviderUnavailable(format!(
                "provider '{}' failed its availability check",
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

        let name = provider.name().to_string();
        {
            let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
            if providers.iter().any(|entry| entry.provider.name() == name) {
                return Err(Error::Validation(format!(
                    "provider '{}' is already registered",
                    name
                )));
            }
            let order = providers.len() as u64;
            providers.push(RegisteredProvider { provider, order });
        }

        info!("registered provider '{}'", name);
        self.events.emit(&CoreEvent::ProviderRegistered { name });
        Ok(())
    }

    /// Remove a provider by name, destroying it best-effort
    ///
    /// With an async runtime present the destroy runs off the caller's
    /// thread; without one it runs inline before returning.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let removed = {
            let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
            let index = providers
                .iter()
                .position(|entry| entry.provider.name() == name);
            index.map(|i| providers.remove(i))
        };

        let entry = removed.ok_or_else(|| {
            Error::ProviderUnavailable(format!("provider '{}' is not registered", name))
        })?;

        // Destroy failures are logged, not fatal
        let events = self.events.clone();
        let provider = entry.provider;
        let provider_name = name.to_string();
        let destroy = move || {
            if let Err(e) = provider.destroy() {
                warn!("failed to destroy provider '{}': {}", provider_name, e);
                events.emit(&CoreEvent::ProviderError {
                    name: provider_name,
                    error: e.to_string(),
                });
            }
        };
        // Off-load the destroy when a runtime is around; otherwise run it
        // inline so callers without one still get a working unregister.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { destroy() });
            }
            Err(_) => destroy(),
        }

        info!("unregistered provider '{}'", name);
        self.events.emit(&CoreEvent::ProviderRemoved {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Highest-priority provider supporting the algorithm
    ///
    /// Priority sorts descending; equal priorities resolve in registration
    /// order.
    pub fn get_best_provider(&self, algorithm: &AlgorithmIdentifier) -> Result<Arc<dyn Provider>> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers
            .iter()
            .filter(|entry| entry.provider.supports_algorithm(algorithm))
            .max_by_key(|entry| (entry.provider.priority(), std::cmp::Reverse(entry.order)))
            .map(|entry| entry.provider.clone())
            .ok_or_else(|| {
                Error::ProviderUnavailable(format!("no provider supports {}", algorithm))
            })
    }

    /// Look up a provider by name
    pub fn get_provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers
            .iter()
            .find(|entry| entry.provider.name() == name)
            .map(|entry| entry.provider.clone())
    }

    /// Probe every registered provider for a status snapshot
    ///
    /// A probe failure is captured per provider and never aborts the scan.
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        let providers: Vec<Arc<dyn Provider>> = {
            let guard = self.providers.read().unwrap_or_else(|e| e.into_inner());
            guard.iter().map(|entry| entry.provider.clone()).collect()
        };

        providers
            .iter()
            .map(|provider| {
                let probe = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    (provider.is_available(), provider.capabilities())
                }));
                match probe {
                    Ok((available, capabilities)) => ProviderStatus {
                        name: provider.name().to_string(),
                        available,
                        priority: provider.priority(),
                        capabilities,
                        error: None,
                    },
                    Err(_) => {
                        let name = provider.name().to_string();
                        self.events.emit(&CoreEvent::ProviderError {
                            name: name.clone(),
                            error: "status probe panicked".to_string(),
                        });
                        ProviderStatus {
                            name,
                            available: false,
                            priority: provider.priority(),
                            capabilities: CryptoCapabilities::default(),
                            error: Some("status probe panicked".to_string()),
                        }
                    }
                }
            })
            .collect()
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
