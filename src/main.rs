use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use mintsmith::app::App;
use mintsmith::config::BaseConfig;
use mintsmith::crypto::proof_to_json;
use mintsmith::orders::{AssetName, ClientIdentity};
use mintsmith::telemetry;

#[derive(Parser)]
#[command(name = "mintsmith", about = "Mint uniquely named items against an authenticated index")]
struct Cli {
    #[command(flatten)]
    config: BaseConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the index digest and every entry.
    Inspect,

    /// Print a proof for the current status of a name.
    Prove { name: String },

    /// Prepare an order for a name.
    Request {
        name: String,
        #[arg(long)]
        owner_key_hash: String,
        #[arg(long)]
        owner_address: String,
        /// Receives the minted item; defaults to the owner address.
        #[arg(long)]
        destination: Option<String>,
    },

    /// Mint the oldest pending orders.
    Mint {
        /// Treat the transaction as accepted: update the snapshot file.
        /// Otherwise the index change is reverted after the instructions
        /// are written.
        #[arg(long)]
        accept: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    info!("Starting mintsmith");

    let cli = Cli::parse();
    info!(
        "Configuration: storage_path={}, snapshot_path={}, max_batch_orders={}",
        cli.config.storage_path, cli.config.snapshot_path, cli.config.max_batch_orders
    );

    let app = App::initialize(cli.config)?;
    let orch = &app.orchestrator;

    match cli.command {
        Command::Inspect => {
            let report = orch.inspect()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Prove { name } => {
            let name = AssetName::new(name)?;
            let root = orch.local_digest()?;
            let proof = orch.coordinator.prove(name.as_bytes())?;
            println!("{}", serde_json::to_string_pretty(&proof_to_json(&root, &proof))?);
        }
        Command::Request {
            name,
            owner_key_hash,
            owner_address,
            destination,
        } => {
            let destination = destination.unwrap_or_else(|| owner_address.clone());
            let client = ClientIdentity {
                key_hash: owner_key_hash,
                address: owner_address,
            };
            let set = orch.prepare_request(&client, &name, &destination).await?;
            info!("Request prepared with {} instructions", set.len());
        }
        Command::Mint { accept } => {
            let mut queue = app.pending_orders().await?;
            for order in orch.stale_orders(&queue)? {
                warn!(
                    "Order {} asks for minted name {}; only a cancel can release it",
                    order.position,
                    order.name()
                );
            }
            let batch = orch.next_batch(&queue, app.config.max_batch_orders)?;
            if batch.is_empty() {
                info!("No pending orders");
                return Ok(());
            }

            let plan = match orch.prepare_mint(&batch).await {
                Ok(plan) => plan,
                Err(e) => {
                    warn!("Mint failed ({:?}): {}", e.class(), e);
                    return Err(e.into());
                }
            };

            if accept {
                app.ledger
                    .record_acceptance(&plan.new_commitment, &plan.consumed)
                    .await?;
                queue.settle(&plan.consumed);
                info!(
                    "Minted {} names, {} orders still pending",
                    plan.consumed.len(),
                    queue.len()
                );
            } else {
                orch.revert_mint(&plan)?;
                info!("Dry run: instructions written, index left unchanged");
            }
        }
    }

    info!("mintsmith done");
    Ok(())
}
