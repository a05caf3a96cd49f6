use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contractkit_tools::config::NETWORK_ENV;
use contractkit_tools::tasks::{ACCOUNTS_TASK, BLOCK_NUMBER_TASK};
use contractkit_tools::{Config, RpcChainProvider, TaskContext, TaskRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contractkit")]
#[command(about = "ContractKit CLI tools for contract development and deployment")]
struct Cli {
    /// Network to run against (defaults to the configured default network)
    #[arg(short, long, global = true, env = NETWORK_ENV)]
    network: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the list of accounts
    Accounts,
    /// Prints the current block number
    #[command(name = "blockNumber", alias = "block-number")]
    BlockNumber,
    /// List registered tasks
    Tasks,
    /// Show the resolved configuration
    Config {
        /// Print the exported configuration object as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("contractkit=info,contractkit_tools=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config() -> Result<Config> {
    Config::load().context("failed to load configuration")
}

async fn run_task(config: &Config, network: Option<&str>, task: &str) -> Result<()> {
    let network_name = network.unwrap_or(config.default_network.as_str());
    let network = config.network(network_name)?;
    let provider = RpcChainProvider::connect(network)
        .with_context(|| format!("failed to set up provider for network '{}'", network_name))?;

    let registry = TaskRegistry::with_builtin_tasks();
    let mut stdout = std::io::stdout();
    let mut ctx = TaskContext {
        config,
        network: network_name,
        provider: &provider,
        out: &mut stdout,
    };
    registry
        .run(task, &mut ctx)
        .await
        .with_context(|| format!("task '{}' failed", task))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Accounts => {
            let config = load_config()?;
            run_task(&config, cli.network.as_deref(), ACCOUNTS_TASK).await
        }
        Commands::BlockNumber => {
            let config = load_config()?;
            run_task(&config, cli.network.as_deref(), BLOCK_NUMBER_TASK).await
        }
        Commands::Tasks => {
            let registry = TaskRegistry::with_builtin_tasks();
            println!("Available tasks:");
            for task in registry.list() {
                println!("  {:<14} {}", task.name(), task.description());
            }
            Ok(())
        }
        Commands::Config { json } => {
            let config = load_config()?;
            if json {
                println!("{}", config.to_json()?);
            } else {
                config.print_summary(&mut std::io::stdout())?;
            }
            Ok(())
        }
    }
}
