//! Typed deployment configuration.
//!
//! The configuration is read from a TOML file (`deploy.toml` by default),
//! layered over built-in defaults and overridden by `FUNDME_*` environment
//! variables, then validated once at startup.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::{Address, I256, address};
use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    environment::{DEFAULT_FORKED_NETWORKS, DEFAULT_LOCAL_NETWORKS, EnvironmentClassifier},
    error::ConfigError,
};

/// The default name of the configuration file.
pub const DEFAULT_CONFIG_FILENAME: &str = "deploy.toml";

/// Prefix of the environment variables overriding configuration keys.
///
/// Nested keys are separated by a double underscore, e.g.
/// `FUNDME_WALLETS__FROM_KEY` overrides `wallets.from_key`.
pub const ENV_PREFIX: &str = "FUNDME_";

/// Default number of decimals of the mock price feed.
pub const DEFAULT_MOCK_DECIMALS: u8 = 8;

/// Default starting answer of the mock price feed: 2,000 with 8 decimals.
pub const DEFAULT_MOCK_STARTING_PRICE: i64 = 2_000 * 10i64.pow(8);

/// Default time to wait for a transaction receipt.
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 300;

/// Network identifiers partitioned into local and forked classifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSets {
    pub local: BTreeSet<String>,
    pub forked: BTreeSet<String>,
}

impl Default for EnvironmentSets {
    fn default() -> Self {
        Self {
            local: DEFAULT_LOCAL_NETWORKS.iter().map(|s| s.to_string()).collect(),
            forked: DEFAULT_FORKED_NETWORKS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Per-network settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// JSON-RPC endpoint of the network. May reference environment
    /// variables as `${VAR}`, e.g. an API key embedded in the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Address of the ETH/USD price feed. Only read for persistent networks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_usd_price_feed: Option<Address>,
    /// Publish the contract source to the block explorer after deployment.
    pub verify: bool,
    /// Etherscan-compatible API endpoint used for verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api: Option<Url>,
}

impl NetworkSettings {
    fn local(host: &str) -> Self {
        Self {
            host: Some(host.to_string()),
            ..Default::default()
        }
    }

    fn live(host: &str, price_feed: Address, explorer_api: &str) -> Self {
        Self {
            host: Some(host.to_string()),
            eth_usd_price_feed: Some(price_feed),
            verify: true,
            explorer_api: Url::parse(explorer_api).ok(),
        }
    }

    /// The JSON-RPC endpoint with `${VAR}` references expanded.
    ///
    /// `Ok(None)` when no host is configured.
    pub fn rpc_url(&self) -> anyhow::Result<Option<Url>> {
        let Some(template) = &self.host else {
            return Ok(None);
        };
        let host = expand_env(template).map_err(|var| {
            anyhow::anyhow!("RPC host references unset environment variable {var}")
        })?;
        let url = Url::parse(&host).context("Invalid RPC host")?;
        Ok(Some(url))
    }
}

/// Replace every `${VAR}` in `template` with the value of `VAR`.
///
/// Returns the name of the first variable that is unset or empty.
fn expand_env(template: &str) -> Result<String, String> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let var = rest[start + 2..start + 2 + len].trim();
        let value = std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| var.to_string())?;

        expanded.push_str(&rest[..start]);
        expanded.push_str(value.trim());
        rest = &rest[start + 3 + len..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

/// A reference to a secret value.
///
/// Written either as the literal secret or as `${VAR}`, in which case the
/// value is read from the environment variable `VAR` when resolved.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SecretRef {
    Env(String),
    Literal(String),
}

impl SecretRef {
    /// Resolve the secret, returning `None` when it is empty or the
    /// referenced variable is unset.
    pub fn resolve(&self) -> Option<String> {
        let value = match self {
            SecretRef::Env(var) => std::env::var(var).ok()?,
            SecretRef::Literal(value) => value.clone(),
        };
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

impl From<String> for SecretRef {
    fn from(raw: String) -> Self {
        match raw
            .trim()
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Some(var) => SecretRef::Env(var.trim().to_string()),
            None => SecretRef::Literal(raw),
        }
    }
}

impl From<SecretRef> for String {
    fn from(secret: SecretRef) -> Self {
        match secret {
            SecretRef::Env(var) => format!("${{{var}}}"),
            SecretRef::Literal(value) => value,
        }
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretRef::Env(var) => write!(f, "Env({var})"),
            SecretRef::Literal(_) => f.write_str("Literal(<redacted>)"),
        }
    }
}

/// Signing configuration for persistent networks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Private key or mnemonic of the deployer account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_key: Option<SecretRef>,
}

/// Construction parameters of the mock price feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockFeedParams {
    pub decimals: u8,
    pub starting_price: i64,
}

impl MockFeedParams {
    /// The starting price as a Solidity `int256`.
    pub fn starting_answer(&self) -> Result<I256, String> {
        I256::try_from(self.starting_price)
            .map_err(|e| format!("starting price {} out of range: {e}", self.starting_price))
    }
}

impl Default for MockFeedParams {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_MOCK_DECIMALS,
            starting_price: DEFAULT_MOCK_STARTING_PRICE,
        }
    }
}

/// Paths to the compiled contract artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub fund_me: PathBuf,
    pub mock_aggregator: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            fund_me: PathBuf::from("build/contracts/FundMe.json"),
            mock_aggregator: PathBuf::from("build/contracts/MockV3Aggregator.json"),
        }
    }
}

/// Complete static configuration of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Network used when none is given on the command line.
    pub default_network: String,
    /// Maximum time to wait for a transaction to be mined.
    pub receipt_timeout_secs: u64,
    pub environments: EnvironmentSets,
    pub networks: BTreeMap<String, NetworkSettings>,
    pub wallets: WalletConfig,
    pub mock: MockFeedParams,
    pub artifacts: ArtifactPaths,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let networks = BTreeMap::from([
            (
                "development".to_string(),
                NetworkSettings::local("http://127.0.0.1:8545"),
            ),
            (
                "ganache-local".to_string(),
                NetworkSettings::local("http://127.0.0.1:7545"),
            ),
            (
                "mainnet-fork".to_string(),
                NetworkSettings {
                    eth_usd_price_feed: Some(address!(
                        "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"
                    )),
                    ..NetworkSettings::local("http://127.0.0.1:8545")
                },
            ),
            (
                "rinkeby".to_string(),
                NetworkSettings::live(
                    "https://rinkeby.infura.io/v3/${WEB3_INFURA_PROJECT_ID}",
                    address!("0x8A753747A1Fa494EC906cE90E9f37563A8AF630e"),
                    "https://api-rinkeby.etherscan.io/api",
                ),
            ),
            (
                "sepolia".to_string(),
                NetworkSettings::live(
                    "https://sepolia.infura.io/v3/${WEB3_INFURA_PROJECT_ID}",
                    address!("0x694AA1769357215DE4FAC081bf1f309aDC325306"),
                    "https://api-sepolia.etherscan.io/api",
                ),
            ),
        ]);

        Self {
            default_network: "development".to_string(),
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            environments: EnvironmentSets::default(),
            networks,
            wallets: WalletConfig {
                from_key: Some(SecretRef::Env("PRIVATE_KEY".to_string())),
            },
            mock: MockFeedParams::default(),
            artifacts: ArtifactPaths::default(),
        }
    }
}

impl DeployConfig {
    /// Load the configuration.
    ///
    /// Layers, lowest priority first: built-in defaults, the TOML file at
    /// `path` (if any), `FUNDME_*` environment variables. An explicit path that
    /// does not exist is an error. The result is validated before being returned.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse deployment configuration")?;

        config
            .validate()
            .context("Invalid deployment configuration")?;

        tracing::debug!(
            path = ?path.map(|p| p.display().to_string()),
            networks = config.networks.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Check the invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_network.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultNetwork);
        }

        let overlap: Vec<String> = self
            .environments
            .local
            .intersection(&self.environments.forked)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(ConfigError::OverlappingEnvironments(overlap));
        }

        if self.mock.starting_price <= 0 {
            return Err(ConfigError::InvalidMockParameters(format!(
                "starting price must be positive, got {}",
                self.mock.starting_price
            )));
        }
        self.mock
            .starting_answer()
            .map_err(ConfigError::InvalidMockParameters)?;

        Ok(())
    }

    pub fn classifier(&self) -> EnvironmentClassifier {
        EnvironmentClassifier::new(
            self.environments.local.clone(),
            self.environments.forked.clone(),
        )
    }

    pub fn network(&self, id: &str) -> Option<&NetworkSettings> {
        self.networks.get(id)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = DeployConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_network, "development");
        assert_eq!(config.mock.decimals, 8);
        assert_eq!(config.mock.starting_price, 200_000_000_000);
        assert!(config.network("rinkeby").unwrap().verify);
        assert!(!config.network("development").unwrap().verify);
    }

    #[test]
    fn test_overlapping_environments_rejected() {
        let mut config = DeployConfig::default();
        config.environments.forked.insert("development".to_string());

        match config.validate() {
            Err(ConfigError::OverlappingEnvironments(ids)) => {
                assert_eq!(ids, vec!["development".to_string()]);
            }
            other => panic!("unexpected validation result: {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_mock_price_rejected() {
        let mut config = DeployConfig::default();
        config.mock.starting_price = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMockParameters(_))
        ));
    }

    #[test]
    fn test_empty_default_network_rejected() {
        let mut config = DeployConfig::default();
        config.default_network = "  ".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyDefaultNetwork)
        ));
    }

    #[test]
    fn test_load_merges_file_over_defaults() {
        let dir = TempDir::new("fundme-config").unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
default_network = "anvil"

[environments]
local = ["anvil"]

[networks.anvil]
host = "http://127.0.0.1:8546"

[networks.rinkeby]
host = "https://rinkeby.example.org"
verify = false

[mock]
decimals = 18
"#,
        )
        .unwrap();

        let config = DeployConfig::load(Some(&path)).unwrap();

        assert_eq!(config.default_network, "anvil");
        assert_eq!(config.mock.decimals, 18);
        assert_eq!(config.mock.starting_price, DEFAULT_MOCK_STARTING_PRICE);
        assert_eq!(
            config.environments.local,
            BTreeSet::from(["anvil".to_string()])
        );

        let rinkeby = config.network("rinkeby").unwrap();
        assert!(!rinkeby.verify);
        assert_eq!(
            rinkeby.rpc_url().unwrap().map(String::from),
            Some("https://rinkeby.example.org/".to_string())
        );
        // Keys absent from the file keep their default value.
        assert_eq!(
            rinkeby.eth_usd_price_feed,
            Some(address!("0x8A753747A1Fa494EC906cE90E9f37563A8AF630e"))
        );
        assert!(config.network("anvil").is_some());
        assert!(config.network("development").is_some());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DeployConfig::load(None).unwrap();

        assert_eq!(config.mock.starting_price, DEFAULT_MOCK_STARTING_PRICE);
        assert_eq!(config.mock.decimals, DEFAULT_MOCK_DECIMALS);
        assert_eq!(config.receipt_timeout(), Duration::from_secs(300));
        assert!(config.network("sepolia").is_some());
    }

    #[test]
    fn test_load_reads_mock_price_from_file() {
        let dir = TempDir::new("fundme-config").unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        std::fs::write(&path, "[mock]\nstarting_price = 350000000000\n").unwrap();

        let config = DeployConfig::load(Some(&path)).unwrap();

        assert_eq!(config.mock.starting_price, 350_000_000_000);
        assert_eq!(
            config.mock.starting_answer().unwrap(),
            I256::try_from(350_000_000_000i64).unwrap()
        );
    }

    #[test]
    fn test_rpc_url_expands_environment() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("FUNDME_TEST_RPC_PROJECT_ID", "abc123") };
        let settings = NetworkSettings {
            host: Some("https://sepolia.infura.io/v3/${FUNDME_TEST_RPC_PROJECT_ID}".to_string()),
            ..Default::default()
        };

        assert_eq!(
            settings.rpc_url().unwrap().map(String::from),
            Some("https://sepolia.infura.io/v3/abc123".to_string())
        );
        assert_eq!(NetworkSettings::default().rpc_url().unwrap(), None);
    }

    #[test]
    fn test_rpc_url_with_unset_variable_fails() {
        let settings = NetworkSettings {
            host: Some("https://node.example.org/${FUNDME_TEST_SURELY_UNSET_PROJECT}".to_string()),
            ..Default::default()
        };

        let err = settings.rpc_url().unwrap_err();

        assert!(err.to_string().contains("FUNDME_TEST_SURELY_UNSET_PROJECT"));
    }

    #[test]
    fn test_expand_env_without_references() {
        assert_eq!(
            expand_env("http://127.0.0.1:8545").unwrap(),
            "http://127.0.0.1:8545"
        );
        assert_eq!(expand_env("http://host/${unterminated").unwrap(), "http://host/${unterminated");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new("fundme-config").unwrap();
        let path = dir.path().join("missing.toml");

        assert!(DeployConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = TempDir::new("fundme-config").unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[environments]
local = ["development"]
forked = ["development"]
"#,
        )
        .unwrap();

        assert!(DeployConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_secret_ref_parsing() {
        assert_eq!(
            SecretRef::from("${PRIVATE_KEY}".to_string()),
            SecretRef::Env("PRIVATE_KEY".to_string())
        );
        assert_eq!(
            SecretRef::from("0xabc".to_string()),
            SecretRef::Literal("0xabc".to_string())
        );
        assert_eq!(
            String::from(SecretRef::Env("KEY".to_string())),
            "${KEY}".to_string()
        );
    }

    #[test]
    fn test_secret_ref_debug_redacts_literal() {
        let secret = SecretRef::Literal("0xdeadbeef".to_string());
        let rendered = format!("{secret:?}");

        assert!(!rendered.contains("deadbeef"));
        assert_eq!(rendered, "Literal(<redacted>)");
    }

    #[test]
    fn test_secret_ref_resolution() {
        assert_eq!(SecretRef::Literal("   ".to_string()).resolve(), None);
        assert_eq!(
            SecretRef::Env("FUNDME_TEST_SURELY_UNSET_VARIABLE".to_string()).resolve(),
            None
        );

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("FUNDME_TEST_SECRET_REF_RESOLUTION", " 0x01 ") };
        assert_eq!(
            SecretRef::Env("FUNDME_TEST_SECRET_REF_RESOLUTION".to_string()).resolve(),
            Some("0x01".to_string())
        );
    }
}
