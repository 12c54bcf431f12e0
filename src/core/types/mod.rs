/*!
Type definitions for the orchestration core.
*/

pub mod algorithms;
pub mod capabilities;
pub mod keys;

pub use algorithms::{AlgorithmIdentifier, AlgorithmType, AlgorithmVersion};
pub use capabilities::{
    AlgorithmCapabilities, AlgorithmMetadata, CryptoCapabilities, PerformanceProfile,
};
pub use keys::{EncapsulationResult, KeyPair, PrivateKey, PublicKey, SignatureBytes};
