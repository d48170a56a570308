//! Checkout request handling: validation, pricing, and session creation.

pub mod request;
pub mod session;
pub mod shipping;

pub use request::{CartLine, CheckoutItem, CheckoutRequest, FieldError, ValidCart};
pub use session::{CheckoutRedirect, SessionBuilder, VALIDATED_CART_METADATA_KEY};
pub use shipping::{ALLOWED_COUNTRIES, SHIPPING_OPTIONS, ShippingOption};
