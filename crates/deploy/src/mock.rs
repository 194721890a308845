//! Session-scoped provisioning of the mock price feed.
//!
//! Simulated networks have no live price feed, so a `MockV3Aggregator` is
//! deployed in its place. The registry makes that deployment idempotent for
//! the lifetime of a session: the first request deploys, every later request
//! reuses the last recorded address.

use alloy_core::{
    primitives::{Address, Bytes},
    sol_types::{SolType, sol_data},
};

use crate::{
    artifact::ContractArtifact,
    chain::ChainClient,
    config::MockFeedParams,
    environment::NetworkEnvironment,
    error::DeployError,
    signer::Signer,
};

/// Solidity signature of the mock constructor: `(uint8 decimals, int256 initialAnswer)`.
type MockConstructorArgs = (sol_data::Uint<8>, sol_data::Int<256>);

/// Append-only list of the mock price feeds deployed during this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockDeploymentRegistry {
    deployed: Vec<Address>,
}

impl MockDeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, address: Address) {
        self.deployed.push(address);
    }

    /// The most recently deployed mock, if any.
    pub fn last(&self) -> Option<Address> {
        self.deployed.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.deployed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deployed.len()
    }
}

/// Deploys the mock price feed at most once per session.
#[derive(Debug, Clone)]
pub struct MockDependencyManager {
    registry: MockDeploymentRegistry,
    artifact: ContractArtifact,
    params: MockFeedParams,
}

impl MockDependencyManager {
    pub fn new(artifact: ContractArtifact, params: MockFeedParams) -> Self {
        Self {
            registry: MockDeploymentRegistry::new(),
            artifact,
            params,
        }
    }

    pub fn registry(&self) -> &MockDeploymentRegistry {
        &self.registry
    }

    /// ABI-encoded `(uint8 decimals, int256 initialAnswer)` constructor arguments.
    fn constructor_args(&self) -> Result<Bytes, DeployError> {
        let answer = self
            .params
            .starting_answer()
            .map_err(DeployError::InvalidMockParameters)?;
        Ok(Bytes::from(MockConstructorArgs::abi_encode_params(&(
            self.params.decimals,
            answer,
        ))))
    }

    /// Return the session's mock price feed, deploying it first if needed.
    ///
    /// The check-then-deploy sequence relies on exclusive access through
    /// `&mut self`; two processes deploying against the same node may still
    /// both deploy a mock.
    pub async fn ensure_deployed<C: ChainClient>(
        &mut self,
        chain: &C,
        env: &NetworkEnvironment,
        signer: &Signer,
    ) -> Result<Address, DeployError> {
        if let Some(existing) = self.registry.last() {
            tracing::info!(
                network = %env.id,
                address = %existing,
                "Mock price feed already deployed, reusing it"
            );
            return Ok(existing);
        }

        tracing::info!(
            network = %env.id,
            decimals = self.params.decimals,
            starting_price = self.params.starting_price,
            "Deploying mocks..."
        );

        let init_code = self.artifact.init_code(&self.constructor_args()?);
        let address = chain
            .deploy_contract(signer, init_code)
            .await
            .map_err(DeployError::MockDeploymentTransaction)?;

        self.registry.append(address);
        tracing::info!(address = %address, "Mocks deployed");

        Ok(address)
    }
}
