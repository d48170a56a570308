//! Wire types for the Printful store API.
//!
//! Only the fields the checkout service reads are declared; serde skips the
//! rest of Printful's fairly large payloads.

use serde::Deserialize;

/// Envelope Printful wraps every response in.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub result: T,
}

/// A synced product with its variants, as returned by
/// `GET /store/products/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProduct,
    pub sync_variants: Vec<SyncVariant>,
}

/// The product-level half of a sync product payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProduct {
    pub id: u64,
    #[serde(default)]
    pub external_id: String,
    pub name: String,
}

/// A single sellable variant of a sync product.
///
/// `retail_price` arrives as a decimal string (e.g., `"19.99"`); parsing it
/// into a `Price` happens in the catalog client so malformed upstream data
/// surfaces as a catalog error rather than a panic.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariant {
    pub id: u64,
    #[serde(default)]
    pub external_id: String,
    pub name: String,
    pub retail_price: String,
    pub currency: String,
}
