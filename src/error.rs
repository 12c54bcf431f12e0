/*!
Error handling for the provider orchestration core.
*/

use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for orchestration operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed or unsupported algorithm request
    #[error("Validation error: {0}")]
    Validation(String),

    /// No compatible registered algorithm
    #[error("Algorithm not found: {0}")]
    AlgorithmNotFound(String),

    /// Provider failed its availability check or initialization
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Fault-isolation short-circuit: the breaker for this key is open
    #[error("Circuit open for {operation} on {algorithm}")]
    CircuitOpen {
        /// Operation whose breaker tripped
        operation: String,
        /// Algorithm whose breaker tripped
        algorithm: String,
    },

    /// A batched provider call failed atomically for all members
    #[error("Batch execution failed: {0}")]
    BatchExecution(String),

    /// Operation issued after or during teardown
    #[error("Orchestrator destroyed")]
    Destroyed,

    /// Provider-surfaced execution error, passed through
    #[error("Provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Shorthand for a validation failure
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Shorthand for a provider-surfaced failure
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Error::Provider(msg.into())
    }
}
