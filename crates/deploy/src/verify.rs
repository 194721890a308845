//! Publication of contract sources to a block explorer.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, Bytes};
use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::{artifact::ContractArtifact, error::VerificationError, rpc};

/// Environment variable holding the explorer API token.
pub const ETHERSCAN_TOKEN: &str = "ETHERSCAN_TOKEN";

/// Maximum time to wait for the explorer to process a submission.
const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between two status checks. Explorers rate-limit aggressively.
const DEFAULT_VERIFY_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Everything needed to verify one deployed contract.
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub network: &'a str,
    pub explorer_api: Option<&'a Url>,
    pub address: Address,
    pub artifact: &'a ContractArtifact,
    /// ABI-encoded constructor arguments the contract was deployed with.
    pub constructor_args: &'a Bytes,
}

/// Submits a deployed contract's source for verification.
pub trait SourceVerifier {
    fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> impl Future<Output = Result<(), VerificationError>> + Send;
}

/// Response envelope shared by every Etherscan API call.
#[derive(Debug, Clone, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: String,
}

impl EtherscanResponse {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// Outcome of a `checkverifystatus` poll, once settled.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VerifyOutcome {
    Verified,
    Failed(String),
}

/// Interpret a `checkverifystatus` response; `None` while still pending.
fn parse_status(response: &EtherscanResponse) -> Option<VerifyOutcome> {
    let result = response.result.trim();
    if result.starts_with("Pending") {
        return None;
    }
    if response.is_ok() || result.eq_ignore_ascii_case("Already Verified") {
        return Some(VerifyOutcome::Verified);
    }
    Some(VerifyOutcome::Failed(result.to_string()))
}

/// [`SourceVerifier`] for Etherscan-compatible explorer APIs.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    token_var: &'static str,
    timeout: Duration,
    poll_interval: Duration,
}

impl EtherscanVerifier {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            token_var: ETHERSCAN_TOKEN,
            timeout: DEFAULT_VERIFY_TIMEOUT,
            poll_interval: DEFAULT_VERIFY_POLL_INTERVAL,
        })
    }

    /// Read the API token from `var` instead of [`ETHERSCAN_TOKEN`].
    pub fn token_var(mut self, var: &'static str) -> Self {
        self.token_var = var;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the delay between two status checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn token(&self) -> Result<String, VerificationError> {
        std::env::var(self.token_var)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(VerificationError::MissingToken(self.token_var))
    }

    async fn submit(
        &self,
        api: &Url,
        token: &str,
        request: &VerificationRequest<'_>,
        source: &str,
    ) -> Result<String, VerificationError> {
        let compiler_version = request
            .artifact
            .compiler_version
            .as_deref()
            .map(|v| {
                if v.starts_with('v') {
                    v.to_string()
                } else {
                    format!("v{v}")
                }
            })
            .unwrap_or_default();
        let address = request.address.to_string();
        let constructor_args = hex::encode(request.constructor_args);
        let (optimization_used, runs) = match request.artifact.optimizer {
            Some(optimizer) => (
                if optimizer.enabled { "1" } else { "0" },
                optimizer.runs.to_string(),
            ),
            None => ("0", "200".to_string()),
        };

        let form = [
            ("apikey", token),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source),
            ("codeformat", "solidity-single-file"),
            ("contractname", request.artifact.name.as_str()),
            ("compilerversion", compiler_version.as_str()),
            ("optimizationUsed", optimization_used),
            ("runs", runs.as_str()),
            // Misspelled on the explorer side.
            ("constructorArguements", constructor_args.as_str()),
        ];

        let response: EtherscanResponse = self
            .client
            .post(api.clone())
            .form(&form)
            .send()
            .await
            .context("Failed to submit verification request")
            .map_err(VerificationError::Request)?
            .json()
            .await
            .context("Failed to parse verification response")
            .map_err(VerificationError::Request)?;

        if !response.is_ok() {
            return Err(VerificationError::Rejected(format!(
                "{}: {}",
                response.message, response.result
            )));
        }

        Ok(response.result)
    }

    async fn check_status(
        &self,
        api: &Url,
        token: &str,
        guid: &str,
    ) -> anyhow::Result<Option<VerifyOutcome>> {
        let response: EtherscanResponse = self
            .client
            .get(api.clone())
            .query(&[
                ("apikey", token),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await
            .context("Failed to query verification status")?
            .json()
            .await
            .context("Failed to parse verification status")?;

        Ok(parse_status(&response))
    }
}

impl SourceVerifier for EtherscanVerifier {
    async fn verify(&self, request: VerificationRequest<'_>) -> Result<(), VerificationError> {
        let api = request
            .explorer_api
            .ok_or_else(|| VerificationError::MissingExplorer(request.network.to_string()))?;
        let source = request
            .artifact
            .source
            .as_deref()
            .ok_or_else(|| VerificationError::MissingSource(request.artifact.name.clone()))?;
        let token = self.token()?;

        tracing::info!(
            network = %request.network,
            address = %request.address,
            contract = %request.artifact.name,
            "Submitting source for verification..."
        );

        let guid = self.submit(api, &token, &request, source).await?;
        tracing::debug!(guid = %guid, "Verification submitted");

        let outcome = rpc::poll_until(
            &format!("verification of {}", request.address),
            self.timeout,
            self.poll_interval,
            || self.check_status(api, &token, &guid),
        )
        .await
        .map_err(VerificationError::Request)?;

        match outcome {
            VerifyOutcome::Verified => {
                tracing::info!(address = %request.address, "Source verified");
                Ok(())
            }
            VerifyOutcome::Failed(reason) => Err(VerificationError::Failed(reason)),
        }
    }
}
