//! Classification of the active network.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Network identifiers classified as local development chains by default.
pub const DEFAULT_LOCAL_NETWORKS: [&str; 2] = ["development", "ganache-local"];

/// Network identifiers classified as forked-mainnet chains by default.
pub const DEFAULT_FORKED_NETWORKS: [&str; 2] = ["mainnet-fork", "mainnet-forked-dev"];

/// The category of a network, driving signer and price-feed selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Classification {
    /// Ephemeral local development chain.
    Local,
    /// Local chain forked from a live network.
    Forked,
    /// Long-lived public network.
    Persistent,
}

impl Classification {
    /// Whether the network is simulated locally (local or forked).
    ///
    /// Simulated networks use the node keyring and a mock price feed.
    pub fn is_simulated(&self) -> bool {
        matches!(self, Classification::Local | Classification::Forked)
    }
}

/// The active network identifier together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkEnvironment {
    pub id: String,
    pub classification: Classification,
}

/// Maps network identifiers to a [`Classification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentClassifier {
    local: BTreeSet<String>,
    forked: BTreeSet<String>,
}

impl EnvironmentClassifier {
    /// Build a classifier from the two identifier sets.
    ///
    /// The sets are expected to be disjoint; configuration validation enforces it.
    /// Should they overlap anyway, local membership wins.
    pub fn new(local: BTreeSet<String>, forked: BTreeSet<String>) -> Self {
        Self { local, forked }
    }

    pub fn classify(&self, identifier: &str) -> Classification {
        if self.local.contains(identifier) {
            Classification::Local
        } else if self.forked.contains(identifier) {
            Classification::Forked
        } else {
            Classification::Persistent
        }
    }

    /// Classify `identifier` and bundle both into a [`NetworkEnvironment`].
    pub fn environment(&self, identifier: &str) -> NetworkEnvironment {
        NetworkEnvironment {
            id: identifier.to_string(),
            classification: self.classify(identifier),
        }
    }
}

impl Default for EnvironmentClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_LOCAL_NETWORKS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_FORKED_NETWORKS.iter().map(|s| s.to_string()).collect(),
        )
    }
}
