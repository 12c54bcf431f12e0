/*!
Pure-software provider.

Backs ML-KEM-768 with the CRYSTALS-Kyber kyber768 parameter set and
ML-DSA-65 with CRYSTALS-Dilithium dilithium3. This backend has no external
dependencies at runtime, so it is always available and serves as the
secondary executor for the fallback guarantee wrapper.
*/

use pqcrypto_kyber::kyber768;
use pqcrypto_dilithium::dilithium3;
use pqcrypto_traits::kem::{
    Ciphertext as KemCiphertext, PublicKey as KemPublicKey, SecretKey as KemSecretKey,
    SharedSecret as KemSharedSecret,
};
use pqcrypto_traits::sign::{
    DetachedSignature as SignDetachedSignature, PublicKey as SignPublicKey,
    SecretKey as SignSecretKey,
};

use crate::core::provider::{require_support, Provider};
use crate::core::types::{
    AlgorithmIdentifier, AlgorithmType, CryptoCapabilities, EncapsulationResult, KeyPair,
    PrivateKey, PublicKey, SignatureBytes,
};
use crate::error::{Error, Result};

/// Always-available software backend for ML-KEM-768 and ML-DSA-65
#[derive(Debug, Default)]
pub struct SoftwareProvider {
    priority: i32,
}

impl SoftwareProvider {
    /// Create the provider with the default (lowest-tier) priority
    pub fn new() -> Self {
        Self { priority: 0 }
    }

    /// Create the provider with an explicit priority
    pub fn with_priority(priority: i32) -> Self {
        Self { priority }
    }

    fn check_kem(&self, algorithm: &AlgorithmIdentifier) -> Result<()> {
        if algorithm.algorithm_type != AlgorithmType::Kem || algorithm.name != "ML-KEM-768" {
            return Err(Error::Validation(format!(
                "software provider cannot run {} as a KEM",
                algorithm
            )));
        }
        Ok(())
    }

    fn check_signature(&self, algorithm: &AlgorithmIdentifier) -> Result<()> {
        if algorithm.algorithm_type != AlgorithmType::Signature || algorithm.name != "ML-DSA-65" {
            return Err(Error::Validation(format!(
                "software provider cannot run {} as a signature scheme",
                algorithm
            )));
        }
        Ok(())
    }
}

// Exact length checks before parsing, so malformed input fails with a
// readable error instead of an opaque backend one.
fn check_len(kind: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::Validation(format!(
            "invalid {} length: expected {}, got {}",
            kind, expected, actual
        )));
    }
    Ok(())
}

impl Provider for SoftwareProvider {
    fn name(&self) -> &str {
        "software"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        true
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> CryptoCapabilities {
        CryptoCapabilities {
            algorithms: vec![
                AlgorithmIdentifier::ml_kem_768(),
                AlgorithmIdentifier::ml_dsa_65(),
            ],
            hardware_backed: false,
            batch_operations: false,
            max_batch_size: 0,
        }
    }

    fn supports_algorithm(&self, algorithm: &AlgorithmIdentifier) -> bool {
        AlgorithmIdentifier::ml_kem_768().is_compatible_with(algorithm)
            || AlgorithmIdentifier::ml_dsa_65().is_compatible_with(algorithm)
    }

    fn generate_key_pair(&self, algorithm: &AlgorithmIdentifier) -> Result<KeyPair> {
        require_support(self, algorithm)?;
        match algorithm.algorithm_type {
            AlgorithmType::Kem => {
                self.check_kem(algorithm)?;
                let (pk, sk) = kyber768::keypair();
                Ok(KeyPair {
                    public: PublicKey::new(algorithm.clone(), pk.as_bytes().to_vec()),
                    private: PrivateKey::new(algorithm.clone(), sk.as_bytes().to_vec()),
                })
            }
            AlgorithmType::Signature => {
                self.check_signature(algorithm)?;
                let (pk, sk) = dilithium3::keypair();
                Ok(KeyPair {
                    public: PublicKey::new(algorithm.clone(), pk.as_bytes().to_vec()),
                    private: PrivateKey::new(algorithm.clone(), sk.as_bytes().to_vec()),
                })
            }
        }
    }

    fn encapsulate(
        &self,
        public_key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<EncapsulationResult> {
        require_support(self, algorithm)?;
        self.check_kem(algorithm)?;
        check_len(
            "public key",
            kyber768::public_key_bytes(),
            public_key.bytes.len(),
        )?;

        let pk = kyber768::PublicKey::from_bytes(&public_key.bytes)
            .map_err(|_| Error::Validation("invalid ML-KEM-768 public key".into()))?;
        let (ss, ct) = kyber768::encapsulate(&pk);
        Ok(EncapsulationResult::new(
            algorithm.clone(),
            ct.as_bytes().to_vec(),
            ss.as_bytes().to_vec(),
        ))
    }

    fn decapsulate(
        &self,
        private_key: &PrivateKey,
        ciphertext: &[u8],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>> {
        require_support(self, algorithm)?;
        self.check_kem(algorithm)?;
        check_len(
            "ciphertext",
            kyber768::ciphertext_bytes(),
            ciphertext.len(),
        )?;
        check_len(
            "private key",
            kyber768::secret_key_bytes(),
            private_key.expose().len(),
        )?;

        let ct = kyber768::Ciphertext::from_bytes(ciphertext)
            .map_err(|_| Error::Validation("invalid ML-KEM-768 ciphertext".into()))?;
        let sk = kyber768::SecretKey::from_bytes(private_key.expose())
            .map_err(|_| Error::Validation("invalid ML-KEM-768 private key".into()))?;
        let ss = kyber768::decapsulate(&ct, &sk);
        Ok(ss.as_bytes().to_vec())
    }

    fn sign(
        &self,
        data: &[u8],
        private_key: &PrivateKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<SignatureBytes> {
        require_support(self, algorithm)?;
        self.check_signature(algorithm)?;
        check_len(
            "private key",
            dilithium3::secret_key_bytes(),
            private_key.expose().len(),
        )?;

        let sk = dilithium3::SecretKey::from_bytes(private_key.expose())
            .map_err(|_| Error::Validation("invalid ML-DSA-65 private key".into()))?;
        let signature = dilithium3::detached_sign(data, &sk);
        Ok(SignatureBytes::new(
            algorithm.clone(),
            signature.as_bytes().to_vec(),
        ))
    }

    fn verify(
        &self,
        data: &[u8],
        signature: &SignatureBytes,
        public_key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<bool> {
        require_support(self, algorithm)?;
        self.check_signature(algorithm)?;
        check_len(
            "public key",
            dilithium3::public_key_bytes(),
            public_key.bytes.len(),
        )?;

        let pk = dilithium3::PublicKey::from_bytes(&public_key.bytes)
            .map_err(|_| Error::Validation("invalid ML-DSA-65 public key".into()))?;
        let sig = match dilithium3::DetachedSignature::from_bytes(&signature.bytes) {
            Ok(sig) => sig,
            // Malformed signature bytes are a verification failure, not an error
            Err(_) => return Ok(false),
        };
        Ok(dilithium3::verify_detached_signature(&sig, data, &pk).is_ok())
    }

    fn import_public_key(
        &self,
        bytes: &[u8],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<PublicKey> {
        require_support(self, algorithm)?;
        let expected = match algorithm.algorithm_type {
            AlgorithmType::Kem => kyber768::public_key_bytes(),
            AlgorithmType::Signature => dilithium3::public_key_bytes(),
        };
        check_len("public key", expected, bytes.len())?;
        Ok(PublicKey::new(algorithm.clone(), bytes.to_vec()))
    }

    fn import_private_key(
        &self,
        bytes: &[u8],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<PrivateKey> {
        require_support(self, algorithm)?;
        let expected = match algorithm.algorithm_type {
            AlgorithmType::Kem => kyber768::secret_key_bytes(),
            AlgorithmType::Signature => dilithium3::secret_key_bytes(),
        };
        check_len("private key", expected, bytes.len())?;
        Ok(PrivateKey::new(algorithm.clone(), bytes.to_vec()))
    }

    fn export_public_key(
        &self,
        key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>> {
        require_support(self, algorithm)?;
        Ok(key.bytes.clone())
    }

    fn export_private_key(
        &self,
        key: &PrivateKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>> {
        require_support(self, algorithm)?;
        Ok(key.expose().to_vec())
    }
}
