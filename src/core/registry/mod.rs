/*!
Registries for algorithms and providers.
*/

pub mod algorithm;
pub mod provider;

pub use algorithm::{AlgorithmRegistry, MigrationFn, ResolvedAlgorithm};
pub use provider::{ProviderRegistry, ProviderStatus};
