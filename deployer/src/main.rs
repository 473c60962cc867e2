use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use l2dex_deployer::{
    account::AccountBook,
    address::qtum_to_ethereum,
    cfg::Config,
    client::{Chain, ethereum, qtum::QtumClient},
    orchestrator::{ChainContext, Orchestrator},
    plan::{self, Stage},
    poller::ConfirmationPoller,
    read_config,
    secret::Environment,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Deploys the L2Dex token and settlement contracts to Ethereum and Qtum")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the deployment plan.
    Run {
        #[clap(long, short, default_value = "deploy.toml")]
        config_file: PathBuf,
        /// Stages to run, in order. Defaults to the `[plan]` section of the configuration.
        #[clap(long = "stage", value_enum)]
        stages: Vec<Stage>,
        /// Write the deployed addresses and funding transactions to this JSON file.
        #[clap(long)]
        report: Option<PathBuf>,
    },
    /// Print the native balance of every configured account.
    Balances {
        #[clap(long, short, default_value = "deploy.toml")]
        config_file: PathBuf,
    },
    /// Print the Ethereum-format address behind a Qtum address.
    TranslateAddress { address: String },
}

/// Connects both chain clients and hands them to the orchestrator.
fn orchestrator(config: &Config) -> Result<Orchestrator> {
    let secrets = Environment;

    let accounts = AccountBook::from_config(Chain::Ethereum, &config.ethereum.accounts, &secrets)?;
    let client = ethereum::connect(&config.ethereum, &accounts)?;
    let ethereum = ChainContext {
        client: Arc::new(client),
        accounts,
        tokens: config.ethereum.tokens.clone(),
        funding: config.ethereum.funding.clone(),
    };

    let accounts = AccountBook::from_config(Chain::Qtum, &config.qtum.accounts, &secrets)?;
    let client = QtumClient::connect(&config.qtum, &secrets)?;
    let qtum = ChainContext {
        client: Arc::new(client),
        accounts,
        tokens: config.qtum.tokens.clone(),
        funding: config.qtum.funding.clone(),
    };

    Ok(Orchestrator::new(
        ethereum,
        qtum,
        ConfirmationPoller::from_config(&config.polling),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(true)
        .init();

    match cli.command {
        Command::Run {
            config_file,
            stages,
            report,
        } => {
            let config = read_config(&config_file)?;
            let stages = plan::select(&stages, &config.plan.stages);
            let orchestrator = orchestrator(&config)?;

            let result = orchestrator.run(&stages).await?;
            info!(
                "Deployment complete: {} contracts, {} funding rounds",
                result.deployments.len(),
                result.funding.len()
            );
            for deployment in &result.deployments {
                println!(
                    "{}\t{}\t{}",
                    deployment.chain, deployment.label, deployment.address
                );
            }
            if let Some(path) = report {
                fs::write(&path, serde_json::to_string_pretty(&result)?)
                    .with_context(|| format!("Cannot write report {}", path.display()))?;
                info!("Report written to {}", path.display());
            }
        }
        Command::Balances { config_file } => {
            let config = read_config(&config_file)?;
            for balance in orchestrator(&config)?.balances().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    balance.chain, balance.role, balance.address, balance.balance
                );
            }
        }
        Command::TranslateAddress { address } => {
            println!("{}", qtum_to_ethereum(&address)?);
        }
    }

    Ok(())
}
