//! Operator command line. `serve` is the default; the `tx` subcommands
//! drive the same transfer engine the HTTP surface uses, so every
//! state change is audited identically.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::services::TransferEngine;

/// Actor recorded on audit events for CLI-driven writes.
pub const CLI_ACTOR: &str = "system:cli";

#[derive(Parser)]
#[command(name = "bursar-core")]
#[command(about = "Bursar Core - stipend disbursement service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction management commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Validate and print the resolved configuration
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Retry a failed transaction
    Retry {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },

    /// Cancel a pending or processing transaction
    Cancel {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,

        /// Reason recorded in the transaction remarks
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx_retry(engine: &TransferEngine, tx_id: Uuid) -> anyhow::Result<()> {
    let transaction = engine.retry(tx_id, CLI_ACTOR).await?;
    println!(
        "transaction {} is now {} (attempt {})",
        transaction.id,
        transaction.status.as_str(),
        transaction.attempt_sequence
    );
    Ok(())
}

pub async fn handle_tx_cancel(
    engine: &TransferEngine,
    tx_id: Uuid,
    reason: &str,
) -> anyhow::Result<()> {
    let transaction = engine.cancel(tx_id, reason, CLI_ACTOR).await?;
    println!(
        "transaction {} cancelled: {}",
        transaction.id,
        transaction.remarks.as_deref().unwrap_or("")
    );
    Ok(())
}
