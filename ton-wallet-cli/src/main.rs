//! TON Wallet CLI
//!
//! Command-line front end for the TON client and the multi-chain key deriver.
//! Every command prints its result as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ton_wallet::crypto::keys::flo;
use ton_wallet::transaction::{ClientConfig, PageOptions, TonClient};

#[derive(Parser)]
#[command(name = "ton-wallet")]
#[command(about = "TON balance/transfer client and multi-chain key deriver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Report lookup failures instead of falling back to zero
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mainnet TON balance
    Balance { address: String },
    /// USDT jetton balance
    Usdt { owner: String },
    /// Convert a raw address to its user-friendly form
    Friendly { address: String },
    /// One page of transaction history
    History {
        address: String,
        #[arg(short, long, default_value_t = 100)]
        limit: u32,
        /// Only list transactions older than this logical time
        #[arg(long)]
        before_lt: Option<u64>,
    },
    /// Testnet TON balance
    TestnetBalance { address: String },
    /// Derive BTC, FLO and TON keys from a WIF or hex key (random when omitted)
    Derive { input: Option<String> },
    /// Generate a new FLO identity
    NewId,
    /// FLO address derived from the hash of a string
    HashId { input: String },
    /// Random FLO address with no known key
    TmpId,
    /// Send TON on testnet
    Send {
        to: String,
        /// Amount in TON, e.g. 0.05
        amount: String,
        /// Hex private key of the sending wallet
        #[arg(long, env = "TON_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        /// Wait for the transfer to be confirmed
        #[arg(short, long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = match cli.command {
        Commands::Derive { input } => {
            let keys = ton_wallet::derive_multi_chain(input.as_deref().map(str::trim))
                .context("key derivation failed")?;
            serde_json::to_value(keys)?
        }
        Commands::NewId => serde_json::to_value(flo::generate_new_id()?)?,
        Commands::HashId { input } => json!({ "floID": flo::hash_id(&input) }),
        Commands::TmpId => json!({ "floID": flo::tmp_id() }),
        command => {
            let client = TonClient::new(ClientConfig::from_env())?;
            run_client_command(&client, command, cli.strict).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_client_command(client: &TonClient, command: Commands, strict: bool) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Balance { address } => {
            let balance = if strict {
                client.fetch_ton_balance(&address).await?
            } else {
                client.get_ton_balance(&address).await
            };
            json!({ "address": address, "balance": balance })
        }
        Commands::Usdt { owner } => {
            let balance = if strict {
                client.fetch_usdt_balance(&owner).await?
            } else {
                client.get_usdt_balance(&owner).await
            };
            json!({ "owner": owner, "usdt": balance })
        }
        Commands::Friendly { address } => {
            let friendly = if strict {
                client.try_convert_to_friendly(&address).await?
            } else {
                client.convert_to_friendly(&address).await
            };
            json!({ "raw": address, "friendly": friendly })
        }
        Commands::History { address, limit, before_lt } => {
            let page = client
                .fetch_transactions(&address, PageOptions { limit, before_lt })
                .await
                .with_context(|| format!("failed to fetch transactions for {}", address))?;
            serde_json::to_value(page)?
        }
        Commands::TestnetBalance { address } => {
            let balance = if strict {
                client.fetch_testnet_balance(&address).await?
            } else {
                client.get_testnet_balance(&address).await
            };
            json!({ "address": address, "balance": balance })
        }
        Commands::Send { to, amount, private_key, wait } => {
            let sent = client
                .send_ton_transaction(&private_key, &to, &amount)
                .await
                .context("transfer failed")?;
            info!("Transfer sent from {} at seqno {}", sent.sender_address, sent.seqno);

            let mut output = json!({
                "senderAddress": sent.sender_address,
                "seqno": sent.seqno,
            });
            if wait {
                let cancel = CancellationToken::new();
                let on_ctrl_c = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted, no longer waiting for confirmation");
                        on_ctrl_c.cancel();
                    }
                });

                let confirmation = client.confirm(&sent, &cancel).await?;
                output["confirmation"] = serde_json::to_value(confirmation)?;
            }
            output
        }
        Commands::Derive { .. } | Commands::NewId | Commands::HashId { .. } | Commands::TmpId => {
            anyhow::bail!("not a client command")
        }
    };
    Ok(value)
}
