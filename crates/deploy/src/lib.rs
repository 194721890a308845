//! fundme-deploy - Environment-aware deployment of a price-feed consumer contract.
//!
//! This crate classifies the active network, picks the signer and the price
//! feed accordingly (deploying a mock feed on local and forked chains), deploys
//! the contract and optionally publishes its source to a block explorer.

pub mod artifact;
pub mod chain;
pub mod config;
pub mod environment;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod price_feed;
pub mod rpc;
pub mod signer;
pub mod verify;

#[cfg(test)]
mod testing;

pub use artifact::{Artifacts, ContractArtifact, OptimizerSettings};
pub use chain::{ChainClient, JsonRpcChain};
pub use config::{DEFAULT_CONFIG_FILENAME, DeployConfig, NetworkSettings};
pub use environment::{Classification, EnvironmentClassifier, NetworkEnvironment};
pub use error::{ConfigError, DeployError, TransactionError, VerificationError};
pub use mock::{MockDependencyManager, MockDeploymentRegistry};
pub use orchestrator::{DeploymentOrchestrator, DeploymentRecord};
pub use price_feed::{PriceFeedAddress, PriceFeedResolver, PriceFeedSource};
pub use signer::{AccountResolver, Signer};
pub use verify::{EtherscanVerifier, SourceVerifier, VerificationRequest};
