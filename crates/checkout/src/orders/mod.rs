//! Order ledger: model, persistence seam, lifecycle rules, legacy import.

pub mod import;
pub mod ledger;
pub mod model;
pub mod store;

pub use import::{ImportError, ImportSummary, LegacyOrderRecord, OrderImporter, RecordError};
pub use ledger::{CreateOutcome, LedgerError, OrderLedger};
pub use model::{Order, OrderDraft, ShippingAddress};
pub use store::{InMemoryOrderStore, OrderStore};
