//! Fixed shipping options and the shipping country allow-list.
//!
//! Both lists are deliberately static: the gateway payment page offers
//! exactly these choices, and changing them is a deploy, not a data edit.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use saltfern_core::CurrencyCode;

/// ISO 3166-1 alpha-2 codes the store ships to.
pub const ALLOWED_COUNTRIES: &[&str] = &["US", "CA", "GB", "AU", "DE", "FR", "NL", "SE"];

/// A flat-rate shipping option offered on the gateway payment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingOption {
    pub display_name: &'static str,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    /// Delivery estimate lower bound, in business days.
    pub min_business_days: u32,
    /// Delivery estimate upper bound, in business days.
    pub max_business_days: u32,
}

/// The two options every checkout session offers.
pub const SHIPPING_OPTIONS: &[ShippingOption] = &[
    ShippingOption {
        display_name: "Standard Shipping",
        amount: dec!(0.00),
        currency: CurrencyCode::USD,
        min_business_days: 5,
        max_business_days: 10,
    },
    ShippingOption {
        display_name: "Express Shipping",
        amount: dec!(9.99),
        currency: CurrencyCode::USD,
        min_business_days: 1,
        max_business_days: 3,
    },
];
