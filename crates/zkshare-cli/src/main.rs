//! zkshare CLI: publish circuits and deploy verifiers from the terminal.
//!
//! Content commands (`publish`, `fetch`, `pin`, `gallery`) work against the
//! IPFS provider, gateways and the local gallery. Ledger commands
//! (`estimate`, `balance`, `airdrop`, `deploy`, `verify`, `status`) go
//! through [`zkshare_core::chain::ChainClient`] and sign with a local
//! keypair file.

mod commands;
mod output;
mod signer;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use zkshare_core::chain::NetworkEnvironment;
use zkshare_core::gallery::GalleryOrder;

#[derive(Parser)]
#[command(
    name = "zkshare",
    about = "Share ZK circuits over IPFS and deploy their verifiers on-chain",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to zkshare.config.json (default: ./zkshare.config.json)
    #[arg(long, global = true, default_value = "zkshare.config.json")]
    config: PathBuf,

    /// Ledger network (overrides the config file)
    #[arg(long, global = true, value_enum)]
    network: Option<NetworkChoice>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a circuit and list it in the gallery
    Publish {
        /// Circuit source file
        file: PathBuf,

        /// Title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        author: String,

        /// Tag, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Also ask the provider to pin the content
        #[arg(long)]
        pin: bool,
    },

    /// Fetch a published circuit by content identifier
    Fetch {
        id: String,

        /// Write the circuit code here instead of printing it
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Bypass the in-process cache
        #[arg(long)]
        fresh: bool,
    },

    /// Pin published content on the provider
    Pin { id: String },

    /// Browse the local gallery
    Gallery {
        #[command(subcommand)]
        command: GalleryCommand,
    },

    /// Estimate the cost of deploying a verifier
    Estimate {
        /// Verification key file (its size sets the account size)
        #[arg(long, conflicts_with = "size")]
        vk: Option<PathBuf>,

        /// Payload size in bytes
        #[arg(long)]
        size: Option<u64>,

        /// Use the default rent rate instead of asking the network
        #[arg(long)]
        offline: bool,
    },

    /// Show an account balance
    Balance {
        /// Account address (defaults to the keypair's)
        account: Option<String>,

        /// Keypair file (JSON array of 64 bytes)
        #[arg(long, env = "ZKSHARE_KEYPAIR")]
        keypair: Option<PathBuf>,
    },

    /// Request test funds (devnet and testnet only)
    Airdrop {
        /// Account address (defaults to the keypair's)
        account: Option<String>,

        /// Amount in whole units
        #[arg(long, default_value = "1")]
        amount: f64,

        #[arg(long, env = "ZKSHARE_KEYPAIR")]
        keypair: Option<PathBuf>,
    },

    /// Deploy a verifier holding a verification key
    Deploy {
        /// Verification key file
        #[arg(long)]
        vk: PathBuf,

        /// Fee payer keypair file
        #[arg(long, env = "ZKSHARE_KEYPAIR")]
        keypair: PathBuf,

        /// Skip the confirmation prompt on mainnet
        #[arg(long, short)]
        yes: bool,
    },

    /// Verify a proof against a deployed verifier
    Verify {
        /// Proof file
        #[arg(long)]
        proof: PathBuf,

        /// Public inputs file (JSON array of strings)
        #[arg(long)]
        public_inputs: Option<PathBuf>,

        /// Verifier account (defaults to the last deployment)
        #[arg(long)]
        account: Option<String>,

        /// Fee payer keypair file
        #[arg(long, env = "ZKSHARE_KEYPAIR")]
        keypair: PathBuf,
    },

    /// Show the active network, its health and the last deployment
    Status {
        /// Wait for this transaction to confirm
        #[arg(long)]
        signature: Option<String>,
    },
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List entries
    List {
        #[arg(long, value_enum, default_value = "recent")]
        order: OrderChoice,

        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Search titles, descriptions and tags
    Search { query: String },
    /// Like an entry
    Like { id: String },
    /// Show an entry and count a view
    View { id: String },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum NetworkChoice {
    Devnet,
    Testnet,
    Mainnet,
}

impl From<NetworkChoice> for NetworkEnvironment {
    fn from(choice: NetworkChoice) -> Self {
        match choice {
            NetworkChoice::Devnet => Self::Devnet,
            NetworkChoice::Testnet => Self::Testnet,
            NetworkChoice::Mainnet => Self::Mainnet,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OrderChoice {
    Recent,
    Popular,
}

impl From<OrderChoice> for GalleryOrder {
    fn from(choice: OrderChoice) -> Self {
        match choice {
            OrderChoice::Recent => Self::Recent,
            OrderChoice::Popular => Self::Popular,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let ctx = commands::Context::load(&cli.config, cli.network.map(Into::into))?;

    match cli.command {
        Commands::Publish {
            file,
            title,
            description,
            author,
            tags,
            pin,
        } => {
            commands::publish::run(&ctx, &file, title, description, author, tags, pin).await?;
        }
        Commands::Fetch { id, output, fresh } => {
            commands::fetch::run(&ctx, &id, output.as_deref(), fresh).await?;
        }
        Commands::Pin { id } => {
            commands::fetch::pin(&ctx, &id).await?;
        }
        Commands::Gallery { command } => match command {
            GalleryCommand::List { order, limit } => {
                commands::gallery::list(&ctx, order.into(), limit).await?;
            }
            GalleryCommand::Search { query } => {
                commands::gallery::search(&ctx, &query).await?;
            }
            GalleryCommand::Like { id } => {
                commands::gallery::like(&ctx, &id).await?;
            }
            GalleryCommand::View { id } => {
                commands::gallery::view(&ctx, &id).await?;
            }
        },
        Commands::Estimate { vk, size, offline } => {
            commands::estimate::run(&ctx, vk.as_deref(), size, offline).await?;
        }
        Commands::Balance { account, keypair } => {
            commands::account::balance(&ctx, account, keypair.as_deref()).await?;
        }
        Commands::Airdrop {
            account,
            amount,
            keypair,
        } => {
            commands::account::airdrop(&ctx, account, amount, keypair.as_deref()).await?;
        }
        Commands::Deploy { vk, keypair, yes } => {
            commands::deploy::run(&ctx, &vk, &keypair, yes).await?;
        }
        Commands::Verify {
            proof,
            public_inputs,
            account,
            keypair,
        } => {
            commands::verify::run(&ctx, &proof, public_inputs.as_deref(), account, &keypair)
                .await?;
        }
        Commands::Status { signature } => {
            commands::status::run(&ctx, signature.as_deref()).await?;
        }
    }

    Ok(())
}
