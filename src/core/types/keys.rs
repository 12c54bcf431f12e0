/*!
Key material types.

Every key carries the identifier of the algorithm it belongs to, so the
orchestration layer can resolve the right backend without a caller-supplied
hint. Private key bytes and shared secrets are wrapped in `Zeroizing` and
wiped when dropped; they are never copied beyond what a single operation
needs unless explicitly exported.
*/

use std::fmt;

use zeroize::Zeroizing;

use crate::core::types::algorithms::AlgorithmIdentifier;

/// Public key bound to a specific algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Algorithm this key belongs to
    pub algorithm: AlgorithmIdentifier,
    /// Raw key bytes
    pub bytes: Vec<u8>,
}

impl PublicKey {
    /// Wrap raw public key bytes
    pub fn new(algorithm: AlgorithmIdentifier, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }
}

/// Private key bound to a specific algorithm, wiped on drop
pub struct PrivateKey {
    /// Algorithm this key belongs to
    pub algorithm: AlgorithmIdentifier,
    bytes: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    /// Wrap raw private key bytes; the buffer is zeroed when dropped
    pub fn new(algorithm: AlgorithmIdentifier, bytes: Vec<u8>) -> Self {
        Self {
            algorithm,
            bytes: Zeroizing::new(bytes),
        }
    }

    /// Borrow the key bytes for a single operation
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        // The copy is wiped on drop like the original
        Self {
            algorithm: self.algorithm.clone(),
            bytes: Zeroizing::new(self.bytes.to_vec()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .field("bytes", &format_args!("[{} bytes redacted]", self.bytes.len()))
            .finish()
    }
}

/// A generated public/private key pair
#[derive(Debug)]
pub struct KeyPair {
    /// Public half
    pub public: PublicKey,
    /// Private half, wiped on drop
    pub private: PrivateKey,
}

/// Result of a KEM encapsulation
pub struct EncapsulationResult {
    /// Algorithm that produced this result
    pub algorithm: AlgorithmIdentifier,
    /// Ciphertext to transmit to the key holder
    pub ciphertext: Vec<u8>,
    /// Shared secret, wiped on drop
    pub shared_secret: Zeroizing<Vec<u8>>,
}

impl EncapsulationResult {
    /// Create an encapsulation result; the shared secret is zeroed on drop
    pub fn new(algorithm: AlgorithmIdentifier, ciphertext: Vec<u8>, shared_secret: Vec<u8>) -> Self {
        Self {
            algorithm,
            ciphertext,
            shared_secret: Zeroizing::new(shared_secret),
        }
    }
}

impl Clone for EncapsulationResult {
    fn clone(&self) -> Self {
        Self {
            algorithm: self.algorithm.clone(),
            ciphertext: self.ciphertext.clone(),
            shared_secret: Zeroizing::new(self.shared_secret.to_vec()),
        }
    }
}

impl fmt::Debug for EncapsulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncapsulationResult")
            .field("algorithm", &self.algorithm)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("shared_secret", &"[redacted]")
            .finish()
    }
}

/// Detached signature produced by a signing operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBytes {
    /// Algorithm that produced this signature
    pub algorithm: AlgorithmIdentifier,
    /// Raw signature bytes
    pub bytes: Vec<u8>,
}

impl SignatureBytes {
    /// Wrap raw signature bytes
    pub fn new(algorithm: AlgorithmIdentifier, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }
}
