use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use lambda_fetch::aws::client::AwsClients;
use lambda_fetch::cache::ArtifactCache;
use lambda_fetch::config::Config;
use lambda_fetch::fetch;

/// Materialize Lambda deployment packages on local disk
#[derive(Parser)]
#[command(name = "lambda-fetch")]
#[command(about = "Download and unpack the Lambda packages behind Step Functions state machines", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// AWS region (defaults to AWS_REGION, then us-east-1)
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS profile for credential loading
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Directory downloaded archives land in
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Directory extracted trees land in
    #[arg(long, global = true)]
    extract_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and extract every Lambda referenced by a state machine
    Workflow {
        /// ARN of the state machine to scan
        state_machine_arn: String,
    },
    /// Download every archive-packaged Lambda in the account
    Account,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    let config = Config::resolve(cli.region, cli.profile, cli.download_dir, cli.extract_dir);

    if let Err(err) = run(cli.command, config).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    let clients = AwsClients::new(&config.profile, &config.region)?;
    let cache = ArtifactCache::new(&config.download_dir, &config.extract_dir);

    let summary = match command {
        Commands::Workflow { state_machine_arn } => {
            let definition = clients
                .describe_state_machine(&state_machine_arn)
                .await
                .context("Failed to fetch state machine definition")?;
            let document: serde_json::Value = serde_json::from_str(&definition)
                .context("Failed to parse state machine definition")?;
            fetch::run_workflow(&clients, &cache, &document).await
        }
        Commands::Account => fetch::run_account(&clients, &cache).await?,
    };

    info!(
        "Done: {} function(s) discovered, {} materialized",
        summary.discovered, summary.materialized
    );
    Ok(())
}
