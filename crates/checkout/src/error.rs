//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Client responses are JSON: `{"error": "..."}` plus a `details` array of
//! field errors when a checkout request fails validation. Internal error text
//! (database messages, upstream API bodies) never reaches the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::checkout::FieldError;
use crate::db::RepositoryError;
use crate::pricing::PriceError;
use crate::stripe::StripeError;

/// Application-level error type for the checkout service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout request failed field-level validation.
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// Price validation failed (mismatch, unknown item, or catalog outage).
    #[error("Price validation error: {0}")]
    Price(#[from] PriceError),

    /// Payment gateway call failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] StripeError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Gateway(_)
                | Self::Price(PriceError::Lookup(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Rejected price claims are the fraud-monitoring signal: log both
        // prices so attempted tampering is visible even though the client
        // only sees a generic retry message.
        if let Self::Price(PriceError::Mismatch(mismatch)) = &self {
            tracing::warn!(
                product_id = %mismatch.product_id,
                variant_id = %mismatch.variant_id,
                claimed_price = %mismatch.claimed,
                server_price = %mismatch.server,
                difference = %mismatch.difference(),
                "Rejected checkout with mismatched price"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Gateway(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Price(err) => match err {
                PriceError::Mismatch(_) | PriceError::UnknownItem { .. } => StatusCode::BAD_REQUEST,
                PriceError::Lookup(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Gateway(_) => {
                "Checkout is temporarily unavailable. Please try again in a moment.".to_string()
            }
            Self::Price(err) => match err {
                PriceError::Mismatch(_) => {
                    "Price verification failed. Please refresh the product page and try again."
                        .to_string()
                }
                PriceError::UnknownItem { .. } => {
                    "One or more cart items are no longer available. Please refresh and try again."
                        .to_string()
                }
                PriceError::Lookup(_) => {
                    "Unable to verify current prices. Please try again in a moment.".to_string()
                }
            },
            Self::Validation(_) => "Invalid checkout request".to_string(),
        };

        let details = match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorBody {
            error: message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for checkout flow steps.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Validated cart", Some(&[("items", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
