//! Checkout route handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::instrument;

use crate::checkout::{CheckoutRedirect, CheckoutRequest, FieldError};
use crate::error::AppError;
use crate::state::AppState;

/// POST /checkout - validate a cart and create a payment session.
///
/// Claimed prices are re-checked against the catalog before anything reaches
/// the payment gateway. The response carries only the session id and the
/// redirect URL; on failure the error type maps to 400 or 503.
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutRedirect>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    })?;

    let cart = request.validate().map_err(AppError::Validation)?;
    let redirect = state.sessions().build(cart).await?;
    Ok(Json(redirect))
}
