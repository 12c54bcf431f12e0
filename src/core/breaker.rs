/*!
Circuit breaker.

One breaker exists per (operation, algorithm) key, created lazily by the
facade. A breaker that accumulates enough consecutive failures opens and
fails calls fast until its reset timeout elapses, at which point a single
half-open trial decides whether it closes again or reopens.
*/

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::config::BreakerConfig;
use crate::core::types::AlgorithmIdentifier;
use crate::error::{Error, Result};

/// Breaker state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow through; failures are counted
    Closed,
    /// Calls fail fast until the reset timeout elapses
    Open,
    /// One trial call is in flight; its outcome decides the next state
    HalfOpen,
}

/// Per-key fault-isolation state machine
#[derive(Debug)]
pub struct CircuitBreaker {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    /// Create a closed breaker with the given tunables
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            last_failure: None,
            threshold: threshold.max(1),
            reset_timeout,
        }
    }

    /// Current state, after applying any due open-to-half-open transition
    pub fn state(&mut self) -> BreakerState {
        self.maybe_transition_half_open();
        self.state
    }

    /// Consecutive failures recorded so far
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Admit or reject a call
    ///
    /// Open breakers reject without touching the provider. An open breaker
    /// whose timeout has elapsed moves to half-open and admits exactly one
    /// trial; further calls are rejected until that trial reports back.
    pub fn check(&mut self) -> bool {
        self.maybe_transition_half_open();
        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                // Admit the single trial and shut the door behind it
                self.state = BreakerState::Open;
                self.last_failure = Some(Instant::now());
                true
            }
        }
    }

    /// Record a successful call: close the breaker and clear the count
    pub fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.failure_count = 0;
        self.last_failure = None;
    }

    /// Record a failed call; returns true if this failure opened (or
    /// reopened) the breaker
    pub fn record_failure(&mut self) -> bool {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());
        match self.state {
            BreakerState::Closed => {
                if self.failure_count >= self.threshold {
                    self.state = BreakerState::Open;
                    true
                } else {
                    false
                }
            }
            // Only admitted calls report back, so a failure in any other
            // state is the half-open trial failing: reopen and restart the
            // timeout, and report the transition
            _ => {
                self.state = BreakerState::Open;
                true
            }
        }
    }

    fn maybe_transition_half_open(&mut self) {
        if self.state == BreakerState::Open {
            if let Some(last) = self.last_failure {
                if last.elapsed() >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen;
                }
            }
        }
    }
}

/// Key identifying one breaker: operation name plus exact algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreakerKey {
    /// Operation name, e.g. "encapsulate"
    pub operation: String,
    /// Exact algorithm identifier
    pub algorithm: AlgorithmIdentifier,
}

/// Lazily populated map of breakers, one per (operation, algorithm)
#[derive(Debug)]
pub struct BreakerMap {
    breakers: Mutex<HashMap<BreakerKey, CircuitBreaker>>,
    config: BreakerConfig,
}

impl BreakerMap {
    /// Create an empty map with shared breaker tunables
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Admit or reject a call for the key, creating the breaker on first use
    pub fn check(&self, operation: &str, algorithm: &AlgorithmIdentifier) -> Result<()> {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        let breaker = breakers
            .entry(BreakerKey {
                operation: operation.to_string(),
                algorithm: algorithm.clone(),
            })
            .or_insert_with(|| {
                CircuitBreaker::new(self.config.threshold, self.config.reset_timeout)
            });
        if breaker.check() {
            Ok(())
        } else {
            Err(Error::CircuitOpen {
                operation: operation.to_string(),
                algorithm: algorithm.name.clone(),
            })
        }
    }

    /// Record a success for the key
    pub fn record_success(&self, operation: &str, algorithm: &AlgorithmIdentifier) {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(breaker) = breakers.get_mut(&BreakerKey {
            operation: operation.to_string(),
            algorithm: algorithm.clone(),
        }) {
            breaker.record_success();
        }
    }

    /// Record a failure for the key; returns true if the breaker just opened
    pub fn record_failure(&self, operation: &str, algorithm: &AlgorithmIdentifier) -> bool {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        let breaker = breakers
            .entry(BreakerKey {
                operation: operation.to_string(),
                algorithm: algorithm.clone(),
            })
            .or_insert_with(|| {
                CircuitBreaker::new(self.config.threshold, self.config.reset_timeout)
            });
        breaker.record_failure()
    }

    /// Drop every breaker whose algorithm matches the exact identifier
    ///
    /// Called on hot-swap so the new provider starts with a clean slate.
    pub fn reset_matching(&self, algorithm: &AlgorithmIdentifier) {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        breakers.retain(|key, _| &key.algorithm != algorithm);
    }
}
