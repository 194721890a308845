//! Compiled contract artifacts.

use std::path::Path;

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Creation bytecode and verification metadata of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: String,
    pub bytecode: Bytes,
    /// Flattened source, when the compiler output carries it.
    pub source: Option<String>,
    pub compiler_version: Option<String>,
    /// Optimizer settings the bytecode was compiled with, when recorded.
    pub optimizer: Option<OptimizerSettings>,
}

/// Solidity optimizer settings of a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    #[serde(default = "default_optimizer_runs")]
    pub runs: u32,
}

fn default_optimizer_runs() -> u32 {
    200
}

/// Either the Brownie layout (`bytecode` is a hex string) or the Foundry
/// layout (`bytecode.object`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

#[derive(Debug, Deserialize)]
struct RawCompiler {
    version: Option<String>,
    optimizer: Option<OptimizerSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: Option<String>,
    bytecode: RawBytecode,
    source: Option<String>,
    compiler: Option<RawCompiler>,
}

impl ContractArtifact {
    /// Parse an artifact from compiler JSON output.
    ///
    /// `fallback_name` is used when the JSON does not name the contract
    /// (Foundry output).
    pub fn from_json(json: &str, fallback_name: &str) -> Result<Self> {
        let raw: RawArtifact =
            serde_json::from_str(json).context("Failed to parse contract artifact JSON")?;

        let hex_code = match raw.bytecode {
            RawBytecode::Hex(code) => code,
            RawBytecode::Object { object } => object,
        };
        let hex_code = hex_code.trim().trim_start_matches("0x");
        if hex_code.is_empty() {
            anyhow::bail!("Artifact `{}` has no creation bytecode", fallback_name);
        }
        let bytecode = hex::decode(hex_code).with_context(|| {
            format!(
                "Artifact `{}` has invalid bytecode (unlinked libraries?)",
                fallback_name
            )
        })?;

        Ok(Self {
            name: raw
                .contract_name
                .unwrap_or_else(|| fallback_name.to_string()),
            bytecode: Bytes::from(bytecode),
            source: raw.source.filter(|s| !s.trim().is_empty()),
            optimizer: raw.compiler.as_ref().and_then(|c| c.optimizer),
            compiler_version: raw.compiler.and_then(|c| c.version),
        })
    }

    /// Load an artifact from disk. The file stem names the contract if the
    /// JSON does not.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let fallback_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Contract");
        let artifact = Self::from_json(&content, fallback_name)
            .with_context(|| format!("Failed to load artifact {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            contract = %artifact.name,
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );

        Ok(artifact)
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn init_code(&self, constructor_args: &[u8]) -> Bytes {
        let mut code = Vec::with_capacity(self.bytecode.len() + constructor_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(constructor_args);
        Bytes::from(code)
    }
}

/// The two contracts involved in a deployment.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// The dependent contract, constructed with a price feed address.
    pub fund_me: ContractArtifact,
    /// The mock price feed, constructed with `(decimals, starting_price)`.
    pub mock_aggregator: ContractArtifact,
}

impl Artifacts {
    pub fn load(fund_me: &Path, mock_aggregator: &Path) -> Result<Self> {
        Ok(Self {
            fund_me: ContractArtifact::load(fund_me)?,
            mock_aggregator: ContractArtifact::load(mock_aggregator)?,
        })
    }
}
