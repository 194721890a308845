//! Resolution of the price feed wired into the deployed contract.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use serde::Serialize;

use crate::{
    chain::ChainClient,
    config::NetworkSettings,
    environment::{Classification, NetworkEnvironment},
    error::DeployError,
    mock::MockDependencyManager,
    signer::Signer,
};

/// Where a price feed address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PriceFeedSource {
    /// Static per-network configuration.
    Configured,
    /// The mock deployed in this session.
    Mock,
}

/// A resolved price feed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceFeedAddress {
    pub address: Address,
    pub source: PriceFeedSource,
}

/// Chooses between the configured live feed and the session mock.
#[derive(Debug, Clone)]
pub struct PriceFeedResolver<'a> {
    networks: &'a BTreeMap<String, NetworkSettings>,
}

impl<'a> PriceFeedResolver<'a> {
    pub fn new(networks: &'a BTreeMap<String, NetworkSettings>) -> Self {
        Self { networks }
    }

    pub async fn resolve<C: ChainClient>(
        &self,
        chain: &C,
        env: &NetworkEnvironment,
        signer: &Signer,
        mocks: &mut MockDependencyManager,
    ) -> Result<PriceFeedAddress, DeployError> {
        let feed = match env.classification {
            Classification::Persistent => {
                let address = self
                    .networks
                    .get(&env.id)
                    .and_then(|settings| settings.eth_usd_price_feed)
                    .ok_or_else(|| DeployError::UnknownNetworkPriceFeed {
                        network: env.id.clone(),
                    })?;
                PriceFeedAddress {
                    address,
                    source: PriceFeedSource::Configured,
                }
            }
            Classification::Local | Classification::Forked => PriceFeedAddress {
                address: mocks.ensure_deployed(chain, env, signer).await?,
                source: PriceFeedSource::Mock,
            },
        };

        tracing::info!(
            network = %env.id,
            address = %feed.address,
            source = %feed.source,
            "Price feed resolved"
        );

        Ok(feed)
    }
}
