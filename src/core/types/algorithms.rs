/*!
Algorithm identity types.

This module defines how algorithms are named, versioned and classified
throughout the orchestration core. Exact lookups compare the full
(name, version, type) triple; compatibility checks compare name, type
and major version only.
*/

use std::fmt;

/// Kind of cryptographic primitive an algorithm implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum AlgorithmType {
    /// Key encapsulation mechanism
    Kem,
    /// Digital signature scheme
    Signature,
}

impl AlgorithmType {
    /// Get the name of the algorithm type as a string
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmType::Kem => "KEM",
            AlgorithmType::Signature => "SIGNATURE",
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic version of an algorithm implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AlgorithmVersion {
    /// Major version; implementations with different majors are incompatible
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl AlgorithmVersion {
    /// Create a new version triple
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for AlgorithmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Immutable identifier of a registered algorithm
///
/// Equality and hashing use the full triple, which is what exact registry
/// lookups key on. Use [`AlgorithmIdentifier::is_compatible_with`] for
/// same-major compatibility checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AlgorithmIdentifier {
    /// Algorithm name, e.g. "ML-KEM-768"
    pub name: String,
    /// Implementation version
    pub version: AlgorithmVersion,
    /// Primitive kind
    pub algorithm_type: AlgorithmType,
}

impl AlgorithmIdentifier {
    /// Create a new identifier
    pub fn new<S: Into<String>>(
        name: S,
        version: AlgorithmVersion,
        algorithm_type: AlgorithmType,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            algorithm_type,
        }
    }

    /// Identifier for ML-KEM-768 (FIPS 203), version 1.0.0
    pub fn ml_kem_768() -> Self {
        Self::new(
            "ML-KEM-768",
            AlgorithmVersion::new(1, 0, 0),
            AlgorithmType::Kem,
        )
    }

    /// Identifier for ML-DSA-65 (FIPS 204), version 1.0.0
    pub fn ml_dsa_65() -> Self {
        Self::new(
            "ML-DSA-65",
            AlgorithmVersion::new(1, 0, 0),
            AlgorithmType::Signature,
        )
    }

    /// Check whether another identifier can substitute for this one
    ///
    /// Compatible means same name, same primitive kind and same major
    /// version; minor and patch may differ.
    pub fn is_compatible_with(&self, other: &AlgorithmIdentifier) -> bool {
        self.name == other.name
            && self.algorithm_type == other.algorithm_type
            && self.version.major == other.version.major
    }
}

impl fmt::Display for AlgorithmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.name, self.version, self.algorithm_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_equality_uses_full_triple() {
        let a = AlgorithmIdentifier::ml_kem_768();
        let mut b = a.clone();
        assert_eq!(a, b);

        b.version.patch = 1;
        assert_ne!(a, b);
        assert!(a.is_compatible_with(&b));
    }

    #[test]
    fn test_major_version_breaks_compatibility() {
        let a = AlgorithmIdentifier::ml_kem_768();
        let b = AlgorithmIdentifier::new(
            "ML-KEM-768",
            AlgorithmVersion::new(2, 0, 0),
            AlgorithmType::Kem,
        );
        assert!(!a.is_compatible_with(&b));
    }

    #[test]
    fn test_type_mismatch_breaks_compatibility() {
        let a = AlgorithmIdentifier::ml_kem_768();
        let b = AlgorithmIdentifier::new(
            "ML-KEM-768",
            AlgorithmVersion::new(1, 0, 0),
            AlgorithmType::Signature,
        );
        assert!(!a.is_compatible_with(&b));
    }
}
