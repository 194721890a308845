//! Transaction signers and their resolution per network classification.

use std::fmt;

use alloy_core::primitives::Address;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};

use crate::{
    chain::ChainClient,
    config::WalletConfig,
    environment::NetworkEnvironment,
    error::DeployError,
};

/// Keyring index of the deployer account on simulated networks.
pub const EPHEMERAL_ACCOUNT_INDEX: usize = 0;

/// The account originating deployment transactions.
#[derive(Clone)]
pub enum Signer {
    /// An unlocked account of the connected node, selected by index.
    ///
    /// Transactions are signed by the node itself.
    Ephemeral { index: usize, address: Address },
    /// A local key derived from configuration. Transactions are signed locally.
    Configured(PrivateKeySigner),
}

impl Signer {
    pub fn address(&self) -> Address {
        match self {
            Signer::Ephemeral { address, .. } => *address,
            Signer::Configured(signer) => signer.address(),
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Signer::Ephemeral { .. })
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signer::Ephemeral { index, address } => f
                .debug_struct("Ephemeral")
                .field("index", index)
                .field("address", address)
                .finish(),
            Signer::Configured(signer) => f
                .debug_struct("Configured")
                .field("address", &signer.address())
                .finish(),
        }
    }
}

/// Picks the signer for a network.
#[derive(Debug, Clone)]
pub struct AccountResolver<'a> {
    wallet: &'a WalletConfig,
}

impl<'a> AccountResolver<'a> {
    pub fn new(wallet: &'a WalletConfig) -> Self {
        Self { wallet }
    }

    /// Resolve the signer for `env`.
    ///
    /// Local and forked networks use the node keyring entry at
    /// [`EPHEMERAL_ACCOUNT_INDEX`]; persistent networks derive a key from
    /// `wallets.from_key`.
    pub async fn resolve<C: ChainClient>(
        &self,
        env: &NetworkEnvironment,
        keyring: &C,
    ) -> Result<Signer, DeployError> {
        let signer = if env.classification.is_simulated() {
            let accounts = keyring
                .accounts()
                .await
                .map_err(|source| DeployError::Keyring {
                    network: env.id.clone(),
                    source,
                })?;
            let address = accounts
                .get(EPHEMERAL_ACCOUNT_INDEX)
                .copied()
                .ok_or_else(|| DeployError::EmptyKeyring {
                    network: env.id.clone(),
                })?;
            Signer::Ephemeral {
                index: EPHEMERAL_ACCOUNT_INDEX,
                address,
            }
        } else {
            let secret = self
                .wallet
                .from_key
                .as_ref()
                .and_then(|key| key.resolve())
                .ok_or_else(|| DeployError::MissingSignerConfiguration {
                    network: env.id.clone(),
                })?;
            let key = derive_signer(&secret).map_err(|reason| DeployError::InvalidSignerKey {
                network: env.id.clone(),
                reason,
            })?;
            Signer::Configured(key)
        };

        tracing::info!(
            network = %env.id,
            classification = %env.classification,
            address = %signer.address(),
            ephemeral = signer.is_ephemeral(),
            "Signer resolved"
        );

        Ok(signer)
    }
}

/// Derive a local signer from a hex private key or a BIP-39 phrase.
///
/// A phrase yields its first account (`m/44'/60'/0'/0/0`).
fn derive_signer(secret: &str) -> Result<PrivateKeySigner, String> {
    if secret.split_whitespace().count() > 1 {
        return MnemonicBuilder::<English>::default()
            .phrase(secret)
            .index(0u32)
            .and_then(|builder| builder.build())
            .map_err(|e| format!("invalid mnemonic: {e}"));
    }

    secret
        .strip_prefix("0x")
        .unwrap_or(secret)
        .parse::<PrivateKeySigner>()
        .map_err(|e| format!("invalid private key: {e}"))
}
