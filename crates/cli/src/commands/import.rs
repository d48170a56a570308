//! Legacy order import command.
//!
//! Reads per-purchase JSON documents exported from the old storefront and
//! backfills them into the order ledger. Without `--force` nothing is
//! written; records whose payment session already has a ledger row are
//! skipped either way.
//!
//! # Usage
//!
//! ```bash
//! # Preview
//! sf-cli import-orders --source ./legacy-orders --dry-run
//!
//! # Write
//! sf-cli import-orders --source ./legacy-orders --force
//! ```
//!
//! # Environment Variables
//!
//! - `CHECKOUT_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! # Exit Status
//!
//! Per-record failures are counted in the summary and exit 0; only an
//! unreadable source directory or an unreachable database exits non-zero.

use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;

use saltfern_checkout::db::{self, PgOrderStore};
use saltfern_checkout::orders::{ImportError, OrderImporter, OrderLedger};

/// Errors from the import command.
#[derive(Debug, thiserror::Error)]
pub enum ImportCliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Run the legacy order import.
pub async fn run(source: &Path, dry_run: bool, force: bool) -> Result<(), ImportCliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("CHECKOUT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| ImportCliError::MissingEnvVar("CHECKOUT_DATABASE_URL"))?;

    let pool = db::create_pool(&SecretString::from(database_url)).await?;
    let ledger = OrderLedger::new(Arc::new(PgOrderStore::new(pool)));

    let importer = OrderImporter::new(ledger, !force);
    let summary = importer.import_dir(source).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{} migrated, {} skipped, {} failed",
            summary.migrated, summary.skipped, summary.failed
        );
        if !force {
            if dry_run {
                println!("Dry run: no rows were written.");
            } else {
                println!("No rows were written. Pass --force to import for real.");
            }
        }
    }

    Ok(())
}
