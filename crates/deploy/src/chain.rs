//! Network client used to query accounts and submit contract creations.

use std::{future::Future, time::Duration};

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U64, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::{error::TransactionError, rpc, signer::Signer};

/// The connection to the active network.
///
/// Every call blocks the deployment run until the node answers; a contract
/// creation resolves only once the transaction is mined.
pub trait ChainClient {
    /// Identifier of the network this client is connected to.
    fn active_network(&self) -> &str;

    /// Accounts managed (and unlocked) by the connected node.
    fn accounts(&self) -> impl Future<Output = anyhow::Result<Vec<Address>>> + Send;

    /// Submit a contract-creation transaction and wait for it to be mined.
    ///
    /// Returns the address of the created contract.
    fn deploy_contract(
        &self,
        signer: &Signer,
        init_code: Bytes,
    ) -> impl Future<Output = Result<Address, TransactionError>> + Send;
}

/// Subset of a transaction receipt needed to validate a contract creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    status: Option<U64>,
    contract_address: Option<Address>,
}

/// [`ChainClient`] over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcChain {
    network: String,
    url: Option<Url>,
    client: reqwest::Client,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl JsonRpcChain {
    /// Create a client for `network`.
    ///
    /// Without an endpoint the client can still be handed to the orchestrator;
    /// every call then fails naming the missing endpoint.
    pub fn new(
        network: impl Into<String>,
        url: Option<Url>,
        receipt_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            network: network.into(),
            url,
            client: rpc::create_client()?,
            receipt_timeout,
            poll_interval: rpc::DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the delay between two receipt polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> anyhow::Result<T> {
        let url = self.url.as_ref().with_context(|| {
            format!(
                "No RPC endpoint for network `{0}`, pass --rpc-url or set networks.{0}.host",
                self.network
            )
        })?;
        rpc::json_rpc_call(&self.client, url.as_str(), method, params).await
    }

    /// Let the node sign and broadcast on behalf of one of its accounts.
    async fn send_unsigned(&self, from: Address, init_code: &Bytes) -> anyhow::Result<B256> {
        self.call(
            "eth_sendTransaction",
            vec![serde_json::json!({
                "from": from,
                "data": init_code,
            })],
        )
        .await
        .context("Node refused to send the transaction")
    }

    /// Sign a legacy EIP-155 creation transaction locally and broadcast it.
    async fn send_signed(
        &self,
        signer: &PrivateKeySigner,
        init_code: &Bytes,
    ) -> anyhow::Result<B256> {
        let from = signer.address();

        let chain_id: U64 = self.call("eth_chainId", vec![]).await?;
        let nonce: U64 = self
            .call(
                "eth_getTransactionCount",
                vec![serde_json::json!(from), serde_json::json!("pending")],
            )
            .await?;
        let gas_price: U256 = self.call("eth_gasPrice", vec![]).await?;
        let gas_price = u128::try_from(gas_price)
            .ok()
            .with_context(|| format!("Node returned an out of range gas price: {gas_price}"))?;
        let gas_limit: U64 = self
            .call(
                "eth_estimateGas",
                vec![serde_json::json!({
                    "from": from,
                    "data": init_code,
                })],
            )
            .await
            .context("Gas estimation failed, the constructor would revert")?;

        let tx = TxLegacy {
            chain_id: Some(chain_id.to::<u64>()),
            nonce: nonce.to::<u64>(),
            gas_price,
            gas_limit: gas_limit.to::<u64>(),
            to: TxKind::Create,
            value: U256::ZERO,
            input: init_code.clone(),
        };
        let raw = sign_transaction(signer, tx)?;

        tracing::debug!(
            from = %from,
            nonce = nonce.to::<u64>(),
            gas_limit = gas_limit.to::<u64>(),
            "Broadcasting signed transaction"
        );

        self.call(
            "eth_sendRawTransaction",
            vec![serde_json::json!(Bytes::from(raw))],
        )
        .await
        .context("Node rejected the signed transaction")
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> anyhow::Result<TransactionReceipt> {
        rpc::poll_until(
            &format!("receipt of {tx_hash}"),
            self.receipt_timeout,
            self.poll_interval,
            || async move {
                self.call::<Option<TransactionReceipt>>(
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await
            },
        )
        .await
    }
}

/// Sign `tx` and return its EIP-2718 encoding.
fn sign_transaction(signer: &PrivateKeySigner, tx: TxLegacy) -> anyhow::Result<Vec<u8>> {
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .context("Failed to sign transaction")?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    Ok(envelope.encoded_2718())
}

impl ChainClient for JsonRpcChain {
    fn active_network(&self) -> &str {
        &self.network
    }

    async fn accounts(&self) -> anyhow::Result<Vec<Address>> {
        self.call("eth_accounts", vec![]).await
    }

    async fn deploy_contract(
        &self,
        signer: &Signer,
        init_code: Bytes,
    ) -> Result<Address, TransactionError> {
        let tx_hash = match signer {
            Signer::Ephemeral { address, .. } => self.send_unsigned(*address, &init_code).await,
            Signer::Configured(key) => self.send_signed(key, &init_code).await,
        }
        .map_err(TransactionError::Broadcast)?;

        tracing::info!(
            network = %self.network,
            tx_hash = %tx_hash,
            "Transaction sent, waiting for receipt..."
        );

        let receipt = self
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|source| TransactionError::Receipt { tx_hash, source })?;

        if receipt.status.is_some_and(|status| status.is_zero()) {
            return Err(TransactionError::Reverted { tx_hash });
        }

        receipt
            .contract_address
            .ok_or(TransactionError::NoContractCreated { tx_hash })
    }
}
