//! balance-cli: create, credit and debit a per-user balance account.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use balance_app::display::tx_line;
use balance_app::{AppBuilder, BalanceManager, ClientConfig, LocalCluster, MissingKeypair, SERVICE};
use balance_core::{Commitment, Pubkey};
use balance_logging::LogLevel;
use balance_rpc::{Cluster, RpcClient, RpcCluster};

/// Lamports given to the signer when running against the in-memory cluster.
const OFFLINE_FUNDING: u64 = 1_000_000_000;

/// Process status for every failure, argument errors included.
const EXIT_FAILURE: i32 = -1;

/// Balance account client
#[derive(Parser, Debug)]
#[command(name = "balance-cli", version)]
#[command(about = "Create, credit and debit a balance account on the balance program")]
struct Args {
    /// JSON-RPC endpoint (overrides the settings file)
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Balance program id (overrides the settings file)
    #[arg(long, global = true)]
    program_id: Option<Pubkey>,

    /// Keypair file in Solana CLI format
    #[arg(short, long, global = true)]
    keypair: Option<PathBuf>,

    /// Settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Commitment to confirm transactions at
    #[arg(long, global = true)]
    commitment: Option<Commitment>,

    /// Run against an in-memory cluster instead of the network
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Show the account, credit 100, debit 50, showing the account after each step
    Demo,
    /// Print the balance account, creating it if needed
    Show,
    /// Create the balance account
    Create,
    /// Credit the balance account
    Credit { amount: u32 },
    /// Debit the balance account
    Debit { amount: u32 },
    /// Print the signer and balance account addresses
    Address,
    /// Request lamports for the signer from the cluster faucet
    Airdrop { lamports: u64 },
}

impl Args {
    /// The subcommand to run; `demo` when none is given.
    fn command(&self) -> Command {
        self.command.unwrap_or(Command::Demo)
    }
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(parse_exit_code(&e));
        }
    };
    if let Err(e) = run(args).await {
        eprintln!("{}", error_report(&e));
        std::process::exit(EXIT_FAILURE);
    }
}

/// `--help` and `--version` succeed; every other parse error is a failure.
fn parse_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        EXIT_FAILURE
    } else {
        0
    }
}

/// Error variants already embed their cause, so only the outer message is printed.
fn error_report(err: &anyhow::Error) -> String {
    format!("Error: {err}")
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut builder = AppBuilder::new(SERVICE).log_level(LogLevel::from_verbose(args.verbose));
    if let Some(path) = &args.config {
        builder = builder.config_path(path);
    }
    if let Some(path) = &args.keypair {
        builder = builder.keypair_path(path);
    }
    if args.offline {
        builder = builder.on_missing_keypair(MissingKeypair::Ephemeral);
    }
    let app = builder.build()?;

    let config = apply_overrides(app.config().clone(), &args);
    let command = args.command();
    let mut out = io::stdout();

    if args.offline {
        let cluster = LocalCluster::new(config.program_id);
        cluster.fund(&app.keypair.pubkey(), OFFLINE_FUNDING);
        let manager = BalanceManager::new(cluster, config.program_id, app.keypair);
        execute(&manager, command, &mut out).await
    } else {
        let client = RpcClient::new_with_commitment(&config.rpc_url, config.commitment);
        let cluster = RpcCluster::new(client).with_confirm_options(config.confirm_options());
        let manager = BalanceManager::new(cluster, config.program_id, app.keypair);
        execute(&manager, command, &mut out).await
    }
}

fn apply_overrides(mut config: ClientConfig, args: &Args) -> ClientConfig {
    if let Some(url) = &args.url {
        config.rpc_url = url.clone();
    }
    if let Some(program_id) = args.program_id {
        config.program_id = program_id;
    }
    if let Some(commitment) = args.commitment {
        config.commitment = commitment;
    }
    config
}

async fn execute<C: Cluster, W: Write + Send>(
    manager: &BalanceManager<C>,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Demo => {
            manager.run_demo(out).await?;
        }
        Command::Show => {
            let report = manager.show(out).await?;
            debug!("{}", report.detailed());
        }
        Command::Create => {
            let signature = manager.create_balance_account().await?;
            writeln!(out, "{}", tx_line(&signature))?;
        }
        Command::Credit { amount } => {
            let signature = manager.credit_account(amount).await?;
            writeln!(out, "{}", tx_line(&signature))?;
        }
        Command::Debit { amount } => {
            let signature = manager.debit_account(amount).await?;
            writeln!(out, "{}", tx_line(&signature))?;
        }
        Command::Address => {
            writeln!(out, "user:            {}", manager.user())?;
            writeln!(out, "program:         {}", manager.program_id())?;
            writeln!(out, "balance account: {}", manager.balance_account_address()?)?;
        }
        Command::Airdrop { lamports } => {
            let user = manager.user();
            let signature = manager.cluster().airdrop(&user, lamports).await?;
            writeln!(out, "{}", tx_line(&signature))?;
            let balance = manager.cluster().get_balance(&user).await?;
            writeln!(out, "{user} now holds {balance} lamports")?;
        }
    }
    Ok(())
}
