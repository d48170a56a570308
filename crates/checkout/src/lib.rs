//! Saltfern Checkout library.
//!
//! This crate provides the checkout service as a library, allowing it to be
//! tested and reused. The flow: a cart posted to `/checkout` is validated
//! field by field, every claimed price is re-checked against the Printful
//! catalog, and only then is a Stripe Checkout session created. Paid sessions
//! land in the order ledger, which also backs the legacy import.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod pricing;
pub mod printful;
pub mod routes;
pub mod state;
pub mod stripe;
