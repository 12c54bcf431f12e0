/*!
Provider contract.

A provider is a capability-advertising executor of one or more algorithms.
Methods are synchronous because the underlying math is CPU-bound; the
orchestration layer moves calls onto blocking workers. A provider may back
many algorithms, and many providers may claim the same algorithm; the
provider registry disambiguates by priority.
*/

pub mod software;

pub use software::SoftwareProvider;

use crate::core::types::{
    AlgorithmIdentifier, CryptoCapabilities, EncapsulationResult, KeyPair, PrivateKey, PublicKey,
    SignatureBytes,
};
use crate::error::{Error, Result};

/// Contract implemented by each algorithm backend
pub trait Provider: Send + Sync {
    /// Provider name, unique within a provider registry
    fn name(&self) -> &str;

    /// Provider implementation version
    fn version(&self) -> &str;

    /// Selection priority; higher wins when several providers back an algorithm
    fn priority(&self) -> i32;

    /// Whether the backend can currently serve operations
    fn is_available(&self) -> bool;

    /// Prepare the backend for use; called before first operation
    fn initialize(&self) -> Result<()>;

    /// Release backend resources; called on unregistration or swap-out
    fn destroy(&self) -> Result<()>;

    /// Capability descriptor for status reporting and batch dispatch
    fn capabilities(&self) -> CryptoCapabilities;

    /// Whether this provider can execute the given algorithm
    fn supports_algorithm(&self, algorithm: &AlgorithmIdentifier) -> bool;

    /// Whether the provider implements genuine batch entry points
    fn supports_batch_operations(&self) -> bool {
        false
    }

    /// Generate a key pair for the algorithm
    fn generate_key_pair(&self, algorithm: &AlgorithmIdentifier) -> Result<KeyPair>;

    /// Generate several key pairs in one backend call
    ///
    /// The default loops over [`Provider::generate_key_pair`]; batch-capable
    /// backends override this with a single native call.
    fn batch_generate_key_pairs(
        &self,
        algorithm: &AlgorithmIdentifier,
        count: usize,
    ) -> Result<Vec<KeyPair>> {
        (0..count).map(|_| self.generate_key_pair(algorithm)).collect()
    }

    /// Encapsulate a shared secret against a public key
    fn encapsulate(
        &self,
        public_key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<EncapsulationResult>;

    /// Encapsulate against several public keys in one backend call
    fn batch_encapsulate(
        &self,
        public_keys: &[PublicKey],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<EncapsulationResult>> {
        public_keys
            .iter()
            .map(|pk| self.encapsulate(pk, algorithm))
            .collect()
    }

    /// Recover the shared secret from a ciphertext
    fn decapsulate(
        &self,
        private_key: &PrivateKey,
        ciphertext: &[u8],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>>;

    /// Sign data with a private key
    fn sign(
        &self,
        data: &[u8],
        private_key: &PrivateKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<SignatureBytes>;

    /// Verify a detached signature
    fn verify(
        &self,
        data: &[u8],
        signature: &SignatureBytes,
        public_key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<bool>;

    /// Parse externally supplied public key bytes
    fn import_public_key(&self, bytes: &[u8], algorithm: &AlgorithmIdentifier)
        -> Result<PublicKey>;

    /// Parse externally supplied private key bytes
    fn import_private_key(
        &self,
        bytes: &[u8],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<PrivateKey>;

    /// Export a public key as raw bytes
    fn export_public_key(
        &self,
        key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>>;

    /// Export a private key as raw bytes
    ///
    /// This is the one sanctioned copy of private material out of the
    /// zeroizing wrapper; callers own the wipe from here.
    fn export_private_key(
        &self,
        key: &PrivateKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>>;
}

/// Reject an operation whose algorithm the provider does not support
pub(crate) fn require_support(
    provider: &dyn Provider,
    algorithm: &AlgorithmIdentifier,
) -> Result<()> {
    if provider.supports_algorithm(algorithm) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "provider '{}' does not support {}",
            provider.name(),
            algorithm
        )))
    }
}
