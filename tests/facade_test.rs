use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pqcrypto_kyber::kyber768;
use rand::RngCore;
use pqcrypto_traits::kem::{
    Ciphertext as KemCiphertext, PublicKey as KemPublicKey, SecretKey as KemSecretKey,
    SharedSecret as KemSharedSecret,
};

use pqc_orchestrator::{
    AlgorithmCapabilities, AlgorithmIdentifier, AlgorithmMetadata, AlgorithmType,
    AlgorithmVersion, CoreEvent, CryptoCapabilities, CryptoFacade, EncapsulationResult, Error,
    KeyPair, OrchestratorConfig, PrivateKey, Provider, PublicKey, Result, SignatureBytes,
    SoftwareProvider,
};

/// Kyber-backed test provider that tags keys with whatever identifier the
/// caller asks for, with an optional injected fault on every operation.
struct TestKemProvider {
    name: String,
    fail: bool,
}

impl TestKemProvider {
    fn working(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
        }
    }

    fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: true,
        }
    }

    fn check_fault(&self) -> Result<()> {
        if self.fail {
            Err(Error::Provider(format!("{}: injected fault", self.name)))
        } else {
            Ok(())
        }
    }
}

impl Provider for TestKemProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "test"
    }

    fn priority(&self) -> i32 {
        50
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
        CryptoCapabilities::default()
    }

    fn supports_algorithm(&self, algorithm: &AlgorithmIdentifier) -> bool {
        algorithm.algorithm_type == AlgorithmType::Kem
    }

    fn generate_key_pair(&self, algorithm: &AlgorithmIdentifier) -> Result<KeyPair> {
        self.check_fault()?;
        let (pk, sk) = kyber768::keypair();
        Ok(KeyPair {
            public: PublicKey::new(algorithm.clone(), pk.as_bytes().to_vec()),
            private: PrivateKey::new(algorithm.clone(), sk.as_bytes().to_vec()),
        })
    }

    fn encapsulate(
        &self,
        public_key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<EncapsulationResult> {
        self.check_fault()?;
        let pk = kyber768::PublicKey::from_bytes(&public_key.bytes)
            .map_err(|_| Error::Validation("bad public key".into()))?;
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
        _algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>> {
        self.check_fault()?;
        let ct = kyber768::Ciphertext::from_bytes(ciphertext)
            .map_err(|_| Error::Validation("bad ciphertext".into()))?;
        let sk = kyber768::SecretKey::from_bytes(private_key.expose())
            .map_err(|_| Error::Validation("bad private key".into()))?;
        Ok(kyber768::decapsulate(&ct, &sk).as_bytes().to_vec())
    }

    fn sign(
        &self,
        _data: &[u8],
        _private_key: &PrivateKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<SignatureBytes> {
        Err(Error::Validation(format!("{} is not a signature scheme", algorithm)))
    }

    fn verify(
        &self,
        _data: &[u8],
        _signature: &SignatureBytes,
        _public_key: &PublicKey,
        algorithm: &AlgorithmIdentifier,
    ) -> Result<bool> {
        Err(Error::Validation(format!("{} is not a signature scheme", algorithm)))
    }

    fn import_public_key(&self, bytes: &[u8], algorithm: &AlgorithmIdentifier) -> Result<PublicKey> {
        Ok(PublicKey::new(algorithm.clone(), bytes.to_vec()))
    }

    fn import_private_key(
        &self,
        bytes: &[u8],
        algorithm: &AlgorithmIdentifier,
    ) -> Result<PrivateKey> {
        Ok(PrivateKey::new(algorithm.clone(), bytes.to_vec()))
    }

    fn export_public_key(&self, key: &PublicKey, _algorithm: &AlgorithmIdentifier) -> Result<Vec<u8>> {
        Ok(key.bytes.clone())
    }

    fn export_private_key(
        &self,
        key: &PrivateKey,
        _algorithm: &AlgorithmIdentifier,
    ) -> Result<Vec<u8>> {
        Ok(key.expose().to_vec())
    }
}

fn software_facade() -> Result<CryptoFacade> {
    software_facade_with(OrchestratorConfig::new())
}

fn software_facade_with(config: OrchestratorConfig) -> Result<CryptoFacade> {
    let provider = Arc::new(SoftwareProvider::new());
    CryptoFacade::builder()
        .with_config(config)
        .with_provider(provider.clone())
        .with_algorithm(AlgorithmMetadata::ml_kem_768(), provider.clone())
        .with_algorithm(AlgorithmMetadata::ml_dsa_65(), provider)
        .build()
}

fn custom_kem_metadata(name: &str) -> AlgorithmMetadata {
    AlgorithmMetadata::new(
        AlgorithmIdentifier::new(name, AlgorithmVersion::new(1, 0, 0), AlgorithmType::Kem),
        AlgorithmCapabilities {
            security_level: 3,
            quantum_resistant: true,
            performance: Default::default(),
            deprecated: false,
        },
        format!("{} (test)", name),
    )
}

#[tokio::test]
async fn test_kem_round_trip() -> Result<()> {
    let facade = software_facade()?;

    let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;
    let encapsulation = facade.encapsulate(&pair.public, None).await?;
    let secret = facade
        .decapsulate(&pair.private, &encapsulation.ciphertext, None)
        .await?;

    assert_eq!(secret.as_slice(), encapsulation.shared_secret.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_sign_and_verify() -> Result<()> {
    let facade = software_facade()?;

    let pair = facade.generate_key_pair(AlgorithmType::Signature).await?;
    let mut message = vec![0u8; 256];
    rand::rng().fill_bytes(&mut message);
    let signature = facade.sign(&message, &pair.private, None).await?;

    assert!(facade.verify(&message, &signature, &pair.public, None).await?);
    assert!(!facade.verify(b"tampered", &signature, &pair.public, None).await?);
    Ok(())
}

#[tokio::test]
async fn test_generate_key_pairs_returns_requested_count() -> Result<()> {
    let facade = software_facade()?;
    let pairs = facade.generate_key_pairs(4, AlgorithmType::Kem).await?;
    assert_eq!(pairs.len(), 4);

    let empty = facade.generate_key_pairs(0, AlgorithmType::Kem).await?;
    assert!(empty.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_hint_of_wrong_kind_rejected() -> Result<()> {
    let facade = software_facade()?;
    let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;

    let result = facade
        .encapsulate(&pair.public, Some(&AlgorithmIdentifier::ml_dsa_65()))
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_metrics_recorded_per_operation() -> Result<()> {
    let facade = software_facade()?;
    let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;
    facade.encapsulate(&pair.public, None).await?;

    let metrics = facade.get_metrics();
    assert!(metrics.operations.len() >= 2);
    assert!(metrics.operations.iter().all(|m| m.success));
    assert!(metrics.workers.tasks_completed >= 2);
    assert!(metrics
        .operations
        .iter()
        .any(|m| m.operation == "encapsulate"));
    Ok(())
}

#[tokio::test]
async fn test_metric_events_emitted() -> Result<()> {
    let facade = software_facade()?;
    let recorded = Arc::new(AtomicUsize::new(0));
    let counter = recorded.clone();
    facade.subscribe(move |event| {
        if matches!(event, CoreEvent::MetricsRecorded(_)) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    facade.generate_key_pair(AlgorithmType::Kem).await?;
    assert!(recorded.load(Ordering::SeqCst) >= 1);
    Ok(())
}

#[tokio::test]
async fn test_fallback_covers_failing_primary() -> Result<()> {
    // Primary backend fails every call; the software secondary supports
    // ML-KEM-768, so operations still succeed.
    let failing = Arc::new(TestKemProvider::failing("flaky-hw"));
    let facade = CryptoFacade::builder()
        .with_algorithm(AlgorithmMetadata::ml_kem_768(), failing)
        .build()?;

    let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;
    let encapsulation = facade.encapsulate(&pair.public, None).await?;
    let secret = facade
        .decapsulate(&pair.private, &encapsulation.ciphertext, None)
        .await?;

    assert_eq!(secret.as_slice(), encapsulation.shared_secret.as_slice());
    let metrics = facade.get_metrics();
    assert!(metrics.fallback.fallbacks_used >= 3);
    // Secondary calls run on the worker pool too: three failed primaries
    // plus three successful secondaries all count as worker tasks.
    assert!(metrics.workers.tasks_completed >= 6);
    assert!(metrics.workers.tasks_failed >= 3);
    Ok(())
}

#[tokio::test]
async fn test_emergency_shutdown_routes_to_software() -> Result<()> {
    let facade = software_facade()?;
    let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;

    facade.emergency_shutdown("scheduled maintenance");
    assert!(facade.fallback().is_emergency());

    let encapsulation = facade.encapsulate(&pair.public, None).await?;
    let secret = facade
        .decapsulate(&pair.private, &encapsulation.ciphertext, None)
        .await?;
    assert_eq!(secret.as_slice(), encapsulation.shared_secret.as_slice());
    assert!(facade.get_metrics().fallback.fallbacks_used >= 1);

    facade.fallback().re_enable();
    assert!(!facade.fallback().is_emergency());
    Ok(())
}

#[tokio::test]
async fn test_breaker_opens_after_threshold() -> Result<()> {
    let mut config = OrchestratorConfig::new();
    config.breaker.threshold = 2;

    // The software secondary does not support this algorithm name, so
    // failures surface instead of being absorbed by the fallback.
    let broken = custom_kem_metadata("BROKEN-KEM");
    let broken_id = broken.identifier.clone();
    let facade = CryptoFacade::builder()
        .with_config(config)
        .with_algorithm(broken, Arc::new(TestKemProvider::failing("flaky-hw")))
        .build()?;

    let key = PublicKey::new(broken_id.clone(), vec![0u8; 8]);
    for _ in 0..2 {
        let result = facade.encapsulate(&key, Some(&broken_id)).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    // Breaker is now open: the provider is no longer consulted.
    let result = facade.encapsulate(&key, Some(&broken_id)).await;
    assert!(matches!(result, Err(Error::CircuitOpen { .. })));
    Ok(())
}

#[tokio::test]
async fn test_failed_trial_emits_opened_event_again() -> Result<()> {
    let mut config = OrchestratorConfig::new();
    config.breaker.threshold = 1;
    // Zero timeout: every call after the first failure is a half-open trial.
    config.breaker.reset_timeout = std::time::Duration::from_millis(0);

    let broken = custom_kem_metadata("BROKEN-KEM");
    let broken_id = broken.identifier.clone();
    let facade = CryptoFacade::builder()
        .with_config(config)
        .with_algorithm(broken, Arc::new(TestKemProvider::failing("flaky-hw")))
        .build()?;

    let opened = Arc::new(AtomicUsize::new(0));
    let counter = opened.clone();
    facade.subscribe(move |event| {
        if let CoreEvent::CircuitOpened { .. } = event {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let key = PublicKey::new(broken_id.clone(), vec![0u8; 8]);
    assert!(facade.encapsulate(&key, Some(&broken_id)).await.is_err());
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    // The admitted trial fails, reopening the breaker; subscribers hear
    // about the reopen just like the first open.
    assert!(facade.encapsulate(&key, Some(&broken_id)).await.is_err());
    assert_eq!(opened.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_hot_swap_resets_breaker_and_serves_new_provider() -> Result<()> {
    let mut config = OrchestratorConfig::new();
    config.breaker.threshold = 1;

    let broken = custom_kem_metadata("BROKEN-KEM");
    let broken_id = broken.identifier.clone();
    let facade = CryptoFacade::builder()
        .with_config(config)
        .with_algorithm(broken, Arc::new(TestKemProvider::failing("flaky-hw")))
        .build()?;

    let replacement = Arc::new(TestKemProvider::working("replacement"));
    let pair = replacement.generate_key_pair(&broken_id)?;

    assert!(facade.encapsulate(&pair.public, Some(&broken_id)).await.is_err());
    assert!(matches!(
        facade.encapsulate(&pair.public, Some(&broken_id)).await,
        Err(Error::CircuitOpen { .. })
    ));

    facade.hot_swap_algorithm(&broken_id, replacement).await?;

    // Fresh breaker, working backend.
    let encapsulation = facade.encapsulate(&pair.public, Some(&broken_id)).await?;
    let secret = facade
        .decapsulate(&pair.private, &encapsulation.ciphertext, Some(&broken_id))
        .await?;
    assert_eq!(secret.as_slice(), encapsulation.shared_secret.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_cache_serves_repeat_encapsulation() -> Result<()> {
    let mut config = OrchestratorConfig::new();
    config.cache.enabled = true;
    let facade = software_facade_with(config)?;

    let pair = facade.generate_key_pair(AlgorithmType::Kem).await?;
    let first = facade.encapsulate(&pair.public, None).await?;
    let second = facade.encapsulate(&pair.public, None).await?;

    // Encapsulation is randomized; identical ciphertexts prove a cache hit.
    assert_eq!(first.ciphertext, second.ciphertext);

    facade.clear_cache();
    let third = facade.encapsulate(&pair.public, None).await?;
    assert_ne!(first.ciphertext, third.ciphertext);
    Ok(())
}

#[tokio::test]
async fn test_clear_cache_emits_event() -> Result<()> {
    let facade = software_facade()?;
    let cleared = Arc::new(AtomicUsize::new(0));
    let counter = cleared.clone();
    facade.subscribe(move |event| {
        if matches!(event, CoreEvent::CacheCleared) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    facade.clear_cache();
    assert_eq!(cleared.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_destroy_is_idempotent_and_rejects_new_work() -> Result<()> {
    let facade = software_facade()?;
    facade.destroy();
    facade.destroy();

    let result = facade.generate_key_pair(AlgorithmType::Kem).await;
    assert!(matches!(result, Err(Error::Destroyed)));
    Ok(())
}

#[tokio::test]
async fn test_unregistered_type_fails_resolution() -> Result<()> {
    let provider = Arc::new(SoftwareProvider::new());
    let facade = CryptoFacade::builder()
        .with_algorithm(AlgorithmMetadata::ml_kem_768(), provider)
        .build()?;

    let result = facade.generate_key_pair(AlgorithmType::Signature).await;
    assert!(matches!(result, Err(Error::AlgorithmNotFound(_))));
    Ok(())
}
