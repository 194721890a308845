//! fundme deploys the FundMe contract to local, forked or live networks.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::Cli;
use fundme_deploy::{
    Artifacts, DeployConfig, DeploymentOrchestrator, DeploymentRecord, EtherscanVerifier,
    JsonRpcChain,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config_path = cli.config_path();
    let config = DeployConfig::load(config_path.as_deref())?;

    let network = cli
        .network
        .clone()
        .unwrap_or_else(|| config.default_network.clone());

    // An unresolved endpoint is only reported once the deployment needs the node.
    let rpc_url = match cli.rpc_url.clone() {
        Some(url) => Some(url),
        None => match config.network(&network).map(|settings| settings.rpc_url()) {
            Some(Ok(url)) => url,
            Some(Err(err)) => {
                tracing::warn!(network = %network, error = %format!("{err:#}"), "Unresolved RPC endpoint");
                None
            }
            None => None,
        },
    };

    tracing::info!(
        network = %network,
        rpc_host = ?rpc_url.as_ref().and_then(|url| url.host_str()),
        config = ?config_path.as_ref().map(|p| p.display().to_string()),
        "Connecting to network..."
    );

    let chain = JsonRpcChain::new(&network, rpc_url, config.receipt_timeout())?;
    let artifacts = Artifacts::load(
        &config.artifacts.fund_me,
        &config.artifacts.mock_aggregator,
    )?;
    let verifier = EtherscanVerifier::new()?;

    let mut orchestrator = DeploymentOrchestrator::new(chain, verifier, config, artifacts);
    let record = orchestrator.deploy().await?;

    println!("Contract deployed to {}", record.contract_address);
    println!("{}", summary(&record));

    if let Some(path) = &cli.record {
        let json = serde_json::to_string_pretty(&record)
            .context("Failed to serialize deployment record")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Deployment record written");
    }

    Ok(())
}

fn summary(record: &DeploymentRecord) -> Table {
    let verified = match record.verified {
        Some(true) => "yes",
        Some(false) => "failed",
        None => "skipped",
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Deployment", "Value"]);
    table.add_row(vec!["Network".to_string(), record.network.clone()]);
    table.add_row(vec![
        "Classification".to_string(),
        record.classification.to_string(),
    ]);
    table.add_row(vec![
        "Contract".to_string(),
        record.contract_address.to_string(),
    ]);
    table.add_row(vec![
        "Price feed".to_string(),
        format!("{} ({})", record.price_feed, record.price_feed_source),
    ]);
    table.add_row(vec!["Deployer".to_string(), record.deployer.to_string()]);
    table.add_row(vec!["Verified".to_string(), verified.to_string()]);
    table
}
