use std::path::PathBuf;

use clap::Parser;
use fundme_deploy::DEFAULT_CONFIG_FILENAME;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "fundme")]
#[command(
    author,
    version,
    about = "Deploy the FundMe contract, with a mock price feed on local and forked networks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "FUNDME_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The network to deploy to.
    ///
    /// If not provided, the `default_network` of the configuration is used.
    #[arg(short, long, env = "FUNDME_NETWORK")]
    pub network: Option<String>,

    /// Path to the deployment configuration file.
    ///
    /// If not provided, `deploy.toml` is read from the current directory when
    /// it exists; otherwise the built-in defaults are used.
    #[arg(short, long, alias = "conf", env = "FUNDME_CONFIG")]
    pub config: Option<PathBuf>,

    /// The JSON-RPC endpoint of the network.
    ///
    /// Overrides the `host` configured for the network.
    #[arg(long, alias = "rpc", env = "FUNDME_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Write the deployment record as JSON to this path.
    #[arg(long, env = "FUNDME_RECORD")]
    pub record: Option<PathBuf>,
}

impl Cli {
    /// The configuration file to load, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                default.exists().then_some(default)
            }
        }
    }
}
