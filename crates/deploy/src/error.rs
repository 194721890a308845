//! Error taxonomy for a deployment run.
//!
//! Everything in [`DeployError`] is fatal and propagates to the caller.
//! [`VerificationError`] is the only recoverable failure: the orchestrator
//! logs it and carries on.

use alloy_core::primitives::B256;
use thiserror::Error;

/// Fatal errors raised while orchestrating a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A persistent network was selected but no signing key is configured.
    #[error("no signing key configured for persistent network `{network}` (set `wallets.from_key`)")]
    MissingSignerConfiguration { network: String },

    /// The configured signing key could not be turned into a signer.
    #[error("invalid signing key for network `{network}`: {reason}")]
    InvalidSignerKey { network: String, reason: String },

    /// The node of a local or forked network exposes no unlocked account.
    #[error("network `{network}` exposes no unlocked accounts")]
    EmptyKeyring { network: String },

    /// The keyring of the connected node could not be queried.
    #[error("failed to list accounts of network `{network}`: {source:#}")]
    Keyring {
        network: String,
        #[source]
        source: anyhow::Error,
    },

    /// A persistent network has no price feed address configured.
    #[error("no price feed address configured for network `{network}`")]
    UnknownNetworkPriceFeed { network: String },

    /// The mock price feed deployment was rejected or reverted.
    #[error("mock price feed deployment failed: {0}")]
    MockDeploymentTransaction(#[source] TransactionError),

    /// The dependent contract deployment was rejected or reverted.
    #[error("contract deployment failed: {0}")]
    ContractDeploymentTransaction(#[source] TransactionError),

    /// The mock construction parameters cannot be ABI-encoded.
    #[error("invalid mock parameters: {0}")]
    InvalidMockParameters(String),
}

/// Failure of a single contract-creation transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The transaction could not be built, signed or broadcast.
    #[error("transaction could not be broadcast: {0:#}")]
    Broadcast(#[source] anyhow::Error),

    /// The transaction was mined with a failed status.
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    /// The transaction succeeded but its receipt names no created contract.
    #[error("transaction {tx_hash} did not create a contract")]
    NoContractCreated { tx_hash: B256 },

    /// The receipt could not be obtained.
    #[error("failed to obtain receipt for {tx_hash}: {source:#}")]
    Receipt {
        tx_hash: B256,
        #[source]
        source: anyhow::Error,
    },
}

/// Source verification failure. Never aborts a deployment.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("environment variable {0} is not set")]
    MissingToken(&'static str),

    #[error("artifact `{0}` carries no source code to publish")]
    MissingSource(String),

    #[error("network `{0}` has no explorer API configured")]
    MissingExplorer(String),

    #[error("explorer rejected the verification request: {0}")]
    Rejected(String),

    #[error("verification request failed: {0:#}")]
    Request(#[source] anyhow::Error),

    #[error("verification failed: {0}")]
    Failed(String),
}

/// Invalid static configuration, detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("networks {0:?} are listed as both local and forked")]
    OverlappingEnvironments(Vec<String>),

    #[error("`default_network` must not be empty")]
    EmptyDefaultNetwork,

    #[error("invalid mock parameters: {0}")]
    InvalidMockParameters(String),
}
