/*!
Event notification for external consumers.

The core emits events for registration, swaps, metrics, batches and
failures. Listener lists are owned by the facade instance and shared with
its registries; there is no global event bus.
*/

use std::sync::{Arc, RwLock};

use crate::core::metrics::OperationMetrics;
use crate::core::types::AlgorithmIdentifier;

/// Events emitted by the orchestration core
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// An algorithm was registered
    AlgorithmRegistered {
        /// Identifier of the registered algorithm
        id: AlgorithmIdentifier,
        /// Name of the backing provider
        provider: String,
    },
    /// An algorithm was unregistered
    AlgorithmUnregistered {
        /// Identifier of the removed algorithm
        id: AlgorithmIdentifier,
    },
    /// An algorithm's provider was hot-swapped
    AlgorithmSwapped {
        /// Identifier of the swapped algorithm
        id: AlgorithmIdentifier,
        /// Name of the new provider
        provider: String,
    },
    /// Periodic or on-demand algorithm status notification
    AlgorithmStatus {
        /// Identifier of the algorithm
        id: AlgorithmIdentifier,
        /// Whether the algorithm is currently enabled
        enabled: bool,
        /// Number of lookups served so far
        usage_count: u64,
    },
    /// A provider was registered
    ProviderRegistered {
        /// Provider name
        name: String,
    },
    /// A provider was removed
    ProviderRemoved {
        /// Provider name
        name: String,
    },
    /// A provider probe or teardown failed
    ProviderError {
        /// Provider name
        name: String,
        /// Failure description
        error: String,
    },
    /// An operation metric was recorded
    MetricsRecorded(OperationMetrics),
    /// The encapsulation cache was cleared
    CacheCleared,
    /// A batch executed and every member was resolved
    BatchCompleted {
        /// Operation/algorithm key of the batch
        key: String,
        /// Number of member operations
        size: usize,
    },
    /// A batched provider call failed atomically
    BatchFailed {
        /// Operation/algorithm key of the batch
        key: String,
        /// Failure description
        error: String,
    },
    /// A circuit breaker transitioned to open
    CircuitOpened {
        /// Operation whose breaker opened
        operation: String,
        /// Algorithm whose breaker opened
        algorithm: String,
    },
    /// Emergency shutdown was triggered; fallback-only mode until re-enabled
    EmergencyShutdown {
        /// Reason supplied by the caller
        reason: String,
    },
}

type Listener = Box<dyn Fn(&CoreEvent) + Send + Sync>;

/// Subscription list for core events
///
/// Cloned handles share the same listener list, so the facade can hand
/// one to each registry it owns.
#[derive(Clone, Default)]
pub struct EventListeners {
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl EventListeners {
    /// Create an empty listener list
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all core events
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&CoreEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(Box::new(listener));
    }

    /// Deliver an event to every subscriber
    pub fn emit(&self, event: &CoreEvent) {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(event);
        }
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .listeners
            .read()
            .map(|l| l.len())
            .unwrap_or(0);
        f.debug_struct("EventListeners").field("count", &count).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribers_receive_events() {
        let events = EventListeners::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        events.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(&CoreEvent::CacheCleared);
        events.emit(&CoreEvent::CacheCleared);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cloned_handle_shares_listeners() {
        let events = EventListeners::new();
        let clone = events.clone();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        events.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        clone.emit(&CoreEvent::CacheCleared);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
