//! End-to-end deployment of the price-feed consumer contract.

use alloy_core::{
    primitives::{Address, Bytes},
    sol_types::SolValue,
};
use serde::Serialize;

use crate::{
    artifact::{Artifacts, ContractArtifact},
    chain::ChainClient,
    config::DeployConfig,
    environment::Classification,
    error::DeployError,
    mock::MockDependencyManager,
    price_feed::{PriceFeedResolver, PriceFeedSource},
    signer::AccountResolver,
    verify::{SourceVerifier, VerificationRequest},
};

/// Outcome of a successful deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub contract_address: Address,
    pub network: String,
    pub classification: Classification,
    pub price_feed: Address,
    pub price_feed_source: PriceFeedSource,
    pub deployer: Address,
    /// `None` when verification is disabled for the network.
    pub verified: Option<bool>,
}

/// Runs deployments against one network.
///
/// The orchestrator owns the session's mock registry: repeated calls to
/// [`deploy`](Self::deploy) on a simulated network reuse the mock price feed
/// deployed by the first one.
pub struct DeploymentOrchestrator<C, V> {
    chain: C,
    verifier: V,
    config: DeployConfig,
    fund_me: ContractArtifact,
    mocks: MockDependencyManager,
}

impl<C: ChainClient, V: SourceVerifier> DeploymentOrchestrator<C, V> {
    pub fn new(chain: C, verifier: V, config: DeployConfig, artifacts: Artifacts) -> Self {
        let mocks = MockDependencyManager::new(artifacts.mock_aggregator, config.mock);
        Self {
            chain,
            verifier,
            config,
            fund_me: artifacts.fund_me,
            mocks,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn mocks(&self) -> &MockDependencyManager {
        &self.mocks
    }

    /// Deploy the contract on the chain's active network.
    ///
    /// Nothing is rolled back on failure: a mock deployed before a failed
    /// contract deployment stays on chain and stays in the registry.
    pub async fn deploy(&mut self) -> Result<DeploymentRecord, DeployError> {
        let network = self.chain.active_network().to_string();
        let env = self.config.classifier().environment(&network);

        tracing::info!(
            network = %env.id,
            classification = %env.classification,
            "Starting deployment"
        );

        let signer = AccountResolver::new(&self.config.wallets)
            .resolve(&env, &self.chain)
            .await?;

        let price_feed = PriceFeedResolver::new(&self.config.networks)
            .resolve(&self.chain, &env, &signer, &mut self.mocks)
            .await?;

        let constructor_args = Bytes::from(price_feed.address.abi_encode());
        let contract_address = self
            .chain
            .deploy_contract(&signer, self.fund_me.init_code(&constructor_args))
            .await
            .map_err(DeployError::ContractDeploymentTransaction)?;

        tracing::info!(
            network = %env.id,
            contract = %self.fund_me.name,
            address = %contract_address,
            price_feed = %price_feed.address,
            "Contract deployed"
        );

        let settings = self.config.network(&env.id);
        let verified = match settings.filter(|s| s.verify) {
            Some(settings) => {
                let request = VerificationRequest {
                    network: &env.id,
                    explorer_api: settings.explorer_api.as_ref(),
                    address: contract_address,
                    artifact: &self.fund_me,
                    constructor_args: &constructor_args,
                };
                match self.verifier.verify(request).await {
                    Ok(()) => Some(true),
                    Err(err) => {
                        tracing::warn!(
                            network = %env.id,
                            address = %contract_address,
                            error = %err,
                            "Source verification failed, continuing"
                        );
                        Some(false)
                    }
                }
            }
            None => None,
        };

        Ok(DeploymentRecord {
            contract_address,
            network: env.id,
            classification: env.classification,
            price_feed: price_feed.address,
            price_feed_source: price_feed.source,
            deployer: signer.address(),
            verified,
        })
    }
}
