//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use url::Url;

use crate::checkout::SessionBuilder;
use crate::config::CheckoutConfig;
use crate::db::PgOrderStore;
use crate::orders::OrderLedger;
use crate::pricing::PriceValidator;
use crate::printful::{CatalogClient, CatalogError};
use crate::stripe::{StripeClient, StripeError};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("base_url must have a host")]
    MissingHost,
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
    #[error("payment gateway client: {0}")]
    Gateway(#[from] StripeError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the session builder and the order ledger.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    sessions: SessionBuilder,
    ledger: OrderLedger,
}

impl AppState {
    /// Create a new application state, building clients from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Checkout configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL or if
    /// either provider client cannot be constructed.
    pub fn new(config: CheckoutConfig, pool: PgPool) -> Result<Self, StateError> {
        // The gateway redirects the customer back to base_url after payment;
        // catch a bad value at startup rather than in a live checkout.
        let base = Url::parse(&config.base_url)?;
        if base.host_str().is_none() {
            return Err(StateError::MissingHost);
        }

        let timeout = config.external_timeout();
        let catalog = CatalogClient::new(&config.printful, timeout)?;
        let gateway = StripeClient::new(&config.stripe, timeout)?;
        let sessions = SessionBuilder::new(PriceValidator::new(catalog), gateway, &config.base_url);
        let ledger = OrderLedger::new(Arc::new(PgOrderStore::new(pool)));

        Ok(Self::with_services(config, sessions, ledger))
    }

    /// Assemble state from already-built services.
    ///
    /// Tests use this to swap in mock-backed clients and an in-memory store.
    #[must_use]
    pub fn with_services(
        config: CheckoutConfig,
        sessions: SessionBuilder,
        ledger: OrderLedger,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                ledger,
            }),
        }
    }

    /// Get a reference to the checkout configuration.
    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Get a reference to the checkout session builder.
    #[must_use]
    pub fn sessions(&self) -> &SessionBuilder {
        &self.inner.sessions
    }

    /// Get a reference to the order ledger.
    #[must_use]
    pub fn ledger(&self) -> &OrderLedger {
        &self.inner.ledger
    }
}
