//! Type-safe price representation using decimal arithmetic.
//!
//! Money never travels as a float. Catalog prices arrive as decimal strings
//! and client-claimed prices are only accepted through [`Price::parse`], which
//! enforces a strict pattern: ASCII digits with an optional dot and one or two
//! fraction digits. Anything else (signs, exponents, extra dots, trailing
//! garbage) is rejected before a `Decimal` is ever constructed.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a price string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceParseError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("price must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not match the accepted pattern.
    #[error("price must be digits with an optional 1-2 digit fraction, e.g. \"19.99\"")]
    InvalidFormat,
}

/// A monetary amount with its currency.
///
/// The amount is held in the currency's standard unit (dollars, not cents);
/// [`Price::minor_units`] converts to integer cents for gateways that bill in
/// the smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Price {
    /// Maximum accepted length of a price string.
    pub const MAX_AMOUNT_LENGTH: usize = 16;

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Parse a `Price` from a strict decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty or longer than [`Self::MAX_AMOUNT_LENGTH`]
    /// - Contains anything but ASCII digits and at most one dot
    /// - Has an empty integer part, or a fraction longer than two digits
    pub fn parse(s: &str, currency: CurrencyCode) -> Result<Self, PriceParseError> {
        parse_amount(s).map(|amount| Self { amount, currency })
    }

    /// Convert to the smallest currency unit (cents).
    ///
    /// Returns `None` if the amount has sub-cent precision or overflows `i64`;
    /// amounts accepted by [`Price::parse`] always convert.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        let scaled = self.amount.checked_mul(Decimal::ONE_HUNDRED)?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.to_i64()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency.code())
    }
}

/// Parse a bare amount with the strict decimal pattern.
///
/// Shared by [`Price::parse`] and request validation, which needs to report
/// pattern violations field-by-field before any price comparison happens.
///
/// # Errors
///
/// See [`Price::parse`].
pub fn parse_amount(s: &str) -> Result<Decimal, PriceParseError> {
    if s.is_empty() {
        return Err(PriceParseError::Empty);
    }

    if s.len() > Price::MAX_AMOUNT_LENGTH {
        return Err(PriceParseError::TooLong {
            max: Price::MAX_AMOUNT_LENGTH,
        });
    }

    let (whole, fraction) = match s.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (s, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceParseError::InvalidFormat);
    }

    if let Some(fraction) = fraction
        && (fraction.is_empty() || fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(PriceParseError::InvalidFormat);
    }

    Decimal::from_str_exact(s).map_err(|_| PriceParseError::InvalidFormat)
}

/// The input was not a known currency code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown currency code: {0}")]
pub struct UnknownCurrency(pub String);

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// The three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// The lowercase code the payment gateway expects.
    #[must_use]
    pub const fn gateway_code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(UnknownCurrency(s.to_owned())),
        }
    }
}
