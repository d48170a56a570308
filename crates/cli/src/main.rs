//! Saltfern CLI - Database migrations and order import tools.
//!
//! # Usage
//!
//! ```bash
//! # Run checkout database migrations
//! sf-cli migrate
//!
//! # Preview a legacy order import
//! sf-cli import-orders --source ./legacy-orders --dry-run
//!
//! # Import legacy orders for real
//! sf-cli import-orders --source ./legacy-orders --force
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `import-orders` - Backfill legacy order documents into the ledger

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Saltfern CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checkout database migrations
    Migrate,
    /// Import legacy order documents into the ledger
    ImportOrders {
        /// Directory containing one JSON document per legacy order
        #[arg(long)]
        source: PathBuf,

        /// Report what would happen without writing
        #[arg(long, conflicts_with = "force")]
        dry_run: bool,

        /// Actually write to the ledger
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::ImportOrders {
            source,
            dry_run,
            force,
        } => {
            commands::import::run(&source, dry_run, force).await?;
        }
    }
    Ok(())
}
