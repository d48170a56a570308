//! Saltfern Core - Shared domain types.
//!
//! This crate provides the common types used across the Saltfern components:
//! - `checkout` - Payment-integrity checkout service
//! - `cli` - Command-line tools for migrations and order import
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and the
//!   order status state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
