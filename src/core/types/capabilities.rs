/*!
Capability descriptors for algorithms and providers.
*/

use crate::core::types::algorithms::AlgorithmIdentifier;

/// Advertised per-operation timings in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceProfile {
    /// Average key generation time
    pub key_gen_ms: f64,
    /// Average encapsulation time
    pub encapsulate_ms: f64,
    /// Average decapsulation time
    pub decapsulate_ms: f64,
    /// Average signing time
    pub sign_ms: f64,
    /// Average verification time
    pub verify_ms: f64,
}

/// Capabilities an algorithm advertises to the selection logic
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AlgorithmCapabilities {
    /// NIST-style security category (1, 3, 5)
    pub security_level: u32,
    /// Whether the algorithm resists quantum attacks
    pub quantum_resistant: bool,
    /// Advertised timings, feeds the selection score's performance bonus
    pub performance: PerformanceProfile,
    /// Deprecated algorithms are penalized by the selection score
    pub deprecated: bool,
}

impl AlgorithmCapabilities {
    /// Selection score used by best-algorithm resolution
    ///
    /// `security_level * 10`, plus 1000 for quantum resistance, plus a
    /// bonus of up to 100 that shrinks with key generation time, minus
    /// 500 for deprecated algorithms.
    pub fn score(&self) -> i64 {
        let security = self.security_level as i64 * 10;
        let quantum = if self.quantum_resistant { 1000 } else { 0 };
        let performance = (100.0 - self.performance.key_gen_ms).max(0.0) as i64;
        let deprecation = if self.deprecated { 500 } else { 0 };
        security + quantum + performance - deprecation
    }
}

/// Metadata describing one registered algorithm
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AlgorithmMetadata {
    /// Identity of the algorithm
    pub identifier: AlgorithmIdentifier,
    /// Capability descriptor
    pub capabilities: AlgorithmCapabilities,
    /// Human-readable description
    pub description: String,
}

impl AlgorithmMetadata {
    /// Create metadata for an algorithm
    pub fn new<S: Into<String>>(
        identifier: AlgorithmIdentifier,
        capabilities: AlgorithmCapabilities,
        description: S,
    ) -> Self {
        Self {
            identifier,
            capabilities,
            description: description.into(),
        }
    }

    /// Metadata for ML-KEM-768 with its standard capability descriptor
    pub fn ml_kem_768() -> Self {
        Self::new(
            AlgorithmIdentifier::ml_kem_768(),
            AlgorithmCapabilities {
                security_level: 3,
                quantum_resistant: true,
                performance: PerformanceProfile {
                    key_gen_ms: 1.0,
                    encapsulate_ms: 1.0,
                    decapsulate_ms: 1.0,
                    ..Default::default()
                },
                deprecated: false,
            },
            "ML-KEM-768 key encapsulation (FIPS 203)",
        )
    }

    /// Metadata for ML-DSA-65 with its standard capability descriptor
    pub fn ml_dsa_65() -> Self {
        Self::new(
            AlgorithmIdentifier::ml_dsa_65(),
            AlgorithmCapabilities {
                security_level: 3,
                quantum_resistant: true,
                performance: PerformanceProfile {
                    key_gen_ms: 2.0,
                    sign_ms: 2.0,
                    verify_ms: 1.0,
                    ..Default::default()
                },
                deprecated: false,
            },
            "ML-DSA-65 digital signatures (FIPS 204)",
        )
    }
}

/// Capability descriptor a provider advertises
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct CryptoCapabilities {
    /// Algorithms the provider claims to support
    pub algorithms: Vec<AlgorithmIdentifier>,
    /// Whether the provider is backed by hardware
    pub hardware_backed: bool,
    /// Whether the provider implements genuine batch entry points
    pub batch_operations: bool,
    /// Largest batch a single provider call accepts
    pub max_batch_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(level: u32, quantum: bool, key_gen_ms: f64, deprecated: bool) -> AlgorithmCapabilities {
        AlgorithmCapabilities {
            security_level: level,
            quantum_resistant: quantum,
            performance: PerformanceProfile {
                key_gen_ms,
                ..Default::default()
            },
            deprecated,
        }
    }

    #[test]
    fn test_quantum_resistance_dominates_security_level() {
        let classical = caps(5, false, 1.0, false);
        let quantum = caps(1, true, 1.0, false);
        assert!(quantum.score() > classical.score());
    }

    #[test]
    fn test_deprecation_penalty() {
        let live = caps(3, true, 10.0, false);
        let deprecated = caps(3, true, 10.0, true);
        assert_eq!(live.score() - deprecated.score(), 500);
    }

    #[test]
    fn test_performance_bonus_floors_at_zero() {
        let slow = caps(3, true, 5000.0, false);
        let fast = caps(3, true, 0.0, false);
        assert_eq!(fast.score() - slow.score(), 100);
    }
}
