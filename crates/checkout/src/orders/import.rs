//! Legacy order import.
//!
//! The previous storefront kept one JSON document per purchase. This module
//! reads those documents and backfills them into the order ledger, keyed by
//! payment session id so a re-run never duplicates rows. Historical totals
//! and timestamps are stored verbatim; prices were server-validated when the
//! purchase originally happened and are not re-checked here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::fs;
use tracing::{info, instrument, warn};

use saltfern_core::{
    CurrencyCode, Email, EmailError, OrderId, OrderStatus, PaymentIntentId, PaymentSessionId,
    ProductId, VariantId,
};

use crate::orders::ledger::{LedgerError, OrderLedger};
use crate::orders::model::{Order, ShippingAddress};
use crate::pricing::ValidatedLineItem;

/// A single purchase document from the legacy store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOrderRecord {
    /// Natural key shared with the new ledger.
    pub session_id: PaymentSessionId,
    #[serde(default)]
    pub payment_intent_id: Option<PaymentIntentId>,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<LegacyLineItem>,
    /// Stored verbatim; never recomputed from items.
    pub total_amount: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Absent in the oldest records, which predate status tracking.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub provider_status: Option<String>,
    #[serde(default)]
    pub provider_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

/// A line item inside a legacy purchase document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyLineItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default)]
    pub name: Option<String>,
    /// Oldest records call this field `price`.
    #[serde(alias = "price")]
    pub unit_amount: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub quantity: u32,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Why a single legacy record could not be converted.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid customer email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("unrecognized order status {0:?}")]
    InvalidStatus(String),

    #[error("record has no line items")]
    EmptyItems,
}

/// Failures that abort the whole import.
///
/// Per-record problems never surface here; they accumulate in
/// [`ImportSummary::failed`] instead.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read legacy source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Counts reported after an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    /// Records inserted into the ledger (or that would be, on a dry run).
    pub migrated: usize,
    /// Records whose payment session already had a ledger row.
    pub skipped: usize,
    /// Records that could not be parsed or converted.
    pub failed: usize,
}

/// Imports legacy purchase documents into the order ledger.
#[derive(Debug, Clone)]
pub struct OrderImporter {
    ledger: OrderLedger,
    dry_run: bool,
}

impl LegacyOrderRecord {
    /// Convert to a ledger order, minting a fresh internal id.
    ///
    /// Legacy records never carried UUIDs, so imported orders get new ids;
    /// the payment session id is what ties the two systems together.
    fn into_order(self) -> Result<Order, RecordError> {
        if self.items.is_empty() {
            return Err(RecordError::EmptyItems);
        }

        let customer_email = Email::parse(&self.customer_email)?;
        let status = match self.status.as_deref() {
            // Pre-status records exist only because a purchase completed
            None => OrderStatus::Paid,
            Some(raw) => raw
                .parse()
                .map_err(|_| RecordError::InvalidStatus(raw.to_string()))?,
        };

        let items = self
            .items
            .into_iter()
            .map(|item| {
                let name = item.name.unwrap_or_else(|| {
                    format!("{} / {}", item.product_id.as_str(), item.variant_id.as_str())
                });
                ValidatedLineItem {
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    name,
                    unit_amount: item.unit_amount,
                    currency: item.currency,
                    quantity: item.quantity,
                }
            })
            .collect();

        Ok(Order {
            id: OrderId::generate(),
            payment_session_id: self.session_id,
            payment_intent_id: self.payment_intent_id,
            customer_email,
            customer_name: self.customer_name,
            shipping_address: self.shipping_address,
            items,
            total_amount: self.total_amount,
            currency: self.currency,
            status,
            provider_status: self.provider_status,
            provider_order_id: self.provider_order_id,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at.unwrap_or(self.created_at),
        })
    }
}

impl OrderImporter {
    #[must_use]
    pub const fn new(ledger: OrderLedger, dry_run: bool) -> Self {
        Self { ledger, dry_run }
    }

    /// Import every `.json` document under `dir`.
    ///
    /// Files are processed in filename order so repeated runs report
    /// deterministically. Unreadable source data or an unreachable ledger
    /// aborts the run; anything wrong with an individual record is counted
    /// in the summary and the batch continues.
    #[instrument(skip(self), fields(dir = %dir.display(), dry_run = self.dry_run))]
    pub async fn import_dir(&self, dir: &Path) -> Result<ImportSummary, ImportError> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(dir).await.map_err(|source| ImportError::Source {
            path: dir.to_path_buf(),
            source,
        })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| ImportError::Source {
                path: dir.to_path_buf(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut summary = ImportSummary::default();
        for path in paths {
            self.import_record(&path, &mut summary).await?;
        }

        info!(
            migrated = summary.migrated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Legacy import finished"
        );
        Ok(summary)
    }

    async fn import_record(
        &self,
        path: &Path,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| ImportError::Source {
                path: path.to_path_buf(),
                source,
            })?;

        let record: LegacyOrderRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Skipping unparseable legacy record");
                summary.failed += 1;
                return Ok(());
            }
        };

        let session_id = record.session_id.clone();
        let order = match record.into_order() {
            Ok(order) => order,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    payment_session_id = %session_id,
                    error = %err,
                    "Skipping invalid legacy record"
                );
                summary.failed += 1;
                return Ok(());
            }
        };

        if self.dry_run {
            let exists = self
                .ledger
                .get_by_payment_session_id(&order.payment_session_id)
                .await?
                .is_some();
            if exists {
                info!(payment_session_id = %order.payment_session_id, "Would skip, already migrated");
                summary.skipped += 1;
            } else {
                info!(payment_session_id = %order.payment_session_id, "Would migrate");
                summary.migrated += 1;
            }
            return Ok(());
        }

        let outcome = self.ledger.backfill_if_absent(order).await?;
        if outcome.created {
            summary.migrated += 1;
        } else {
            info!(
                payment_session_id = %outcome.order.payment_session_id,
                "Skipping already migrated payment session"
            );
            summary.skipped += 1;
        }
        Ok(())
    }
}
