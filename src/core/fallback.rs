/*!
Fallback guarantee wrapper.

Wraps a primary executor and an always-available secondary so every call
returns a result or a typed failure. Emergency shutdown latches the wrapper
into fallback-only mode until explicitly re-enabled.
*/

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::warn;

use crate::core::events::{CoreEvent, EventListeners};
use crate::core::types::AlgorithmIdentifier;
use crate::error::Result;

/// Counters describing fallback behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackMetrics {
    /// Calls that went through the primary successfully
    pub primary_successes: u64,
    /// Calls served by the secondary after a primary failure
    pub fallbacks_used: u64,
    /// Calls where the secondary also failed
    pub fallback_failures: u64,
}

/// Guarantees a result or typed error by pairing a primary executor with an
/// always-available secondary
pub struct FallbackGuarantee {
    emergency: AtomicBool,
    primary_successes: AtomicU64,
    fallbacks_used: AtomicU64,
    fallback_failures: AtomicU64,
    events: EventListeners,
}

impl FallbackGuarantee {
    /// Create a wrapper emitting events on the given listener list
    pub fn new(events: EventListeners) -> Self {
        Self {
            emergency: AtomicBool::new(false),
            primary_successes: AtomicU64::new(0),
            fallbacks_used: AtomicU64::new(0),
            fallback_failures: AtomicU64::new(0),
            events,
        }
    }

    /// Run the primary, falling back to the secondary on any error
    ///
    /// During emergency shutdown the primary is skipped outright. The
    /// secondary's own failure is fatal for the call.
    pub async fn execute_with_fallback<T, P, S>(
        &self,
        operation: &str,
        algorithm: &AlgorithmIdentifier,
        primary: P,
        secondary: S,
    ) -> Result<T>
    where
        P: Future<Output = Result<T>>,
        S: Future<Output = Result<T>>,
    {
        if !self.emergency.load(Ordering::SeqCst) {
            match primary.await {
                Ok(value) => {
                    self.primary_successes.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        "primary executor failed for {} on {}: {}, trying fallback",
                        operation, algorithm.name, e
                    );
                }
            }
        }

        self.fallbacks_used.fetch_add(1, Ordering::Relaxed);
        match secondary.await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.fallback_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Force all subsequent calls onto the secondary until re-enabled
    pub fn emergency_shutdown<S: Into<String>>(&self, reason: S) {
        let reason = reason.into();
        warn!("emergency shutdown engaged: {}", reason);
        self.emergency.store(true, Ordering::SeqCst);
        self.events.emit(&CoreEvent::EmergencyShutdown { reason });
    }

    /// Allow primary execution again
    pub fn re_enable(&self) {
        self.emergency.store(false, Ordering::SeqCst);
    }

    /// Whether the wrapper is in fallback-only mode
    pub fn is_emergency(&self) -> bool {
        self.emergency.load(Ordering::SeqCst)
    }

    /// Snapshot of fallback counters
    pub fn metrics(&self) -> FallbackMetrics {
        FallbackMetrics {
            primary_successes: self.primary_successes.load(Ordering::Relaxed),
            fallbacks_used: self.fallbacks_used.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn wrapper() -> FallbackGuarantee {
        FallbackGuarantee::new(EventListeners::new())
    }

    #[tokio::test]
    async fn test_primary_result_preferred() {
        let fallback = wrapper();
        let id = AlgorithmIdentifier::ml_kem_768();

        let value = fallback
            .execute_with_fallback("encapsulate", &id, async { Ok(1) }, async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(value, 1);
        assert_eq!(fallback.metrics().fallbacks_used, 0);
    }

    #[tokio::test]
    async fn test_secondary_covers_primary_failure() {
        let fallback = wrapper();
        let id = AlgorithmIdentifier::ml_kem_768();

        let value = fallback
            .execute_with_fallback(
                "encapsulate",
                &id,
                async { Err::<i32, _>(Error::provider("hardware fault")) },
                async { Ok(2) },
            )
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(fallback.metrics().fallbacks_used, 1);
    }

    #[tokio::test]
    async fn test_secondary_failure_is_fatal() {
        let fallback = wrapper();
        let id = AlgorithmIdentifier::ml_kem_768();

        let result = fallback
            .execute_with_fallback(
                "encapsulate",
                &id,
                async { Err::<i32, _>(Error::provider("primary down")) },
                async { Err::<i32, _>(Error::provider("secondary down")) },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(fallback.metrics().fallback_failures, 1);
    }

    #[tokio::test]
    async fn test_emergency_shutdown_skips_primary() {
        use std::sync::Arc;

        let fallback = wrapper();
        let id = AlgorithmIdentifier::ml_kem_768();
        fallback.emergency_shutdown("hardware recall");

        let primary_ran = Arc::new(AtomicBool::new(false));
        let flag = primary_ran.clone();
        let value = fallback
            .execute_with_fallback(
                "encapsulate",
                &id,
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(1)
                },
                async { Ok(7) },
            )
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(!primary_ran.load(Ordering::SeqCst));

        fallback.re_enable();
        assert!(!fallback.is_emergency());
    }
}
