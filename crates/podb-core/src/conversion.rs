//! # Conversion Module
//!
//! Converts currency and percentage amounts between the persisted integer
//! representation and [`Decimal`], which is used for arithmetic and display.
//!
//! ## Two Scale Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MONETARY (configurable, 0-4 decimal places)                            │
//! │                                                                         │
//! │    stored 123450, scale 2  ──►  1234.50                                 │
//! │    stored 123450, scale 3  ──►  123.450                                 │
//! │    Any sign, any magnitude (totals can go negative mid-edit)            │
//! │                                                                         │
//! │  PERCENTAGE (fixed, always two implied places)                          │
//! │                                                                         │
//! │    stored 15  ──►  0.15                                                 │
//! │    Domain is 0..=99 / 0.00..=0.99, anything else is a contract error    │
//! │                                                                         │
//! │  ROUNDING: always half-to-even, only at the integer/decimal boundary    │
//! │    2.345 → 2.34     2.355 → 2.36     2.3451 → 2.35                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use podb_core::conversion::{decimal_to_monetary, monetary_to_decimal, CurrencyScale};
//!
//! let scale = CurrencyScale::default(); // 2 decimal places
//! let price = monetary_to_decimal(1099, scale);
//! assert_eq!(price.to_string(), "10.99");
//! assert_eq!(decimal_to_monetary(price, scale).unwrap(), 1099);
//! ```

use std::fmt;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ValidationError};

/// Largest supported number of currency decimal places.
pub const MAX_CURRENCY_SCALE: u32 = 4;

/// Implied decimal places of a stored percentage.
pub const PERCENTAGE_SCALE: u32 = 2;

/// Largest stored percentage.
pub const MAX_PERCENTAGE: i64 = 99;

const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointNearestEven;

// =============================================================================
// Currency Scale
// =============================================================================

/// Number of decimal places of the deployment's currency.
///
/// Configured once (`[locale] currency_decimal_places`) and passed explicitly
/// into every conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CurrencyScale(u32);

impl CurrencyScale {
    /// Creates a scale, rejecting anything above four places.
    pub fn new(decimal_places: u32) -> Result<Self, ConversionError> {
        if decimal_places > MAX_CURRENCY_SCALE {
            return Err(ConversionError::InvalidScale(decimal_places));
        }
        Ok(CurrencyScale(decimal_places))
    }

    #[inline]
    pub const fn decimal_places(&self) -> u32 {
        self.0
    }

    /// `10^decimal_places`, the divisor between stored and decimal values.
    #[inline]
    pub const fn factor(&self) -> i64 {
        10_i64.pow(self.0)
    }
}

impl Default for CurrencyScale {
    fn default() -> Self {
        CurrencyScale(2)
    }
}

impl TryFrom<u32> for CurrencyScale {
    type Error = ConversionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        CurrencyScale::new(value)
    }
}

impl From<CurrencyScale> for u32 {
    fn from(scale: CurrencyScale) -> Self {
        scale.0
    }
}

impl fmt::Display for CurrencyScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Percentage Conversions
// =============================================================================

/// Converts a stored percentage (0..=99) to a decimal fraction.
///
/// ## Example
/// ```rust
/// use podb_core::conversion::percentage_to_decimal;
/// use rust_decimal::Decimal;
///
/// assert_eq!(percentage_to_decimal(15).unwrap(), Decimal::new(15, 2));
/// assert!(percentage_to_decimal(100).is_err());
/// ```
pub fn percentage_to_decimal(value: i64) -> Result<Decimal, ConversionError> {
    if !(0..=MAX_PERCENTAGE).contains(&value) {
        return Err(ConversionError::PercentageOutOfRange(value));
    }
    Ok(Decimal::new(value, PERCENTAGE_SCALE))
}

/// Converts a decimal fraction (0.00..=0.99) to a stored percentage.
///
/// The range check runs on the unrounded value, so `0.995` is rejected
/// rather than rounded up to a full 100%.
pub fn decimal_to_percentage(value: Decimal) -> Result<i64, ConversionError> {
    let max = Decimal::new(MAX_PERCENTAGE, PERCENTAGE_SCALE);
    if value < Decimal::ZERO || value > max {
        return Err(ConversionError::DecimalPercentageOutOfRange(
            value.to_string(),
        ));
    }

    let rounded = value.round_dp_with_strategy(PERCENTAGE_SCALE, ROUNDING);
    (rounded * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| ConversionError::Overflow(value.to_string()))
}

// =============================================================================
// Monetary Conversions
// =============================================================================

/// Converts a stored monetary integer to a decimal.
///
/// No range restriction: totals may be large or negative during edits.
#[inline]
pub fn monetary_to_decimal(value: i64, scale: CurrencyScale) -> Decimal {
    Decimal::new(value, scale.decimal_places())
}

/// Converts a decimal to a stored monetary integer.
///
/// Rounds half-to-even at `scale` places first. Values that are already at
/// the target scale come back unchanged.
///
/// ## Example
/// ```rust
/// use podb_core::conversion::{decimal_to_monetary, CurrencyScale};
/// use rust_decimal::Decimal;
///
/// let scale = CurrencyScale::default();
/// // 2.345 is a tie: rounds to the even neighbour
/// assert_eq!(decimal_to_monetary(Decimal::new(2345, 3), scale).unwrap(), 234);
/// assert_eq!(decimal_to_monetary(Decimal::new(2355, 3), scale).unwrap(), 236);
/// ```
pub fn decimal_to_monetary(value: Decimal, scale: CurrencyScale) -> Result<i64, ConversionError> {
    let rounded = value.round_dp_with_strategy(scale.decimal_places(), ROUNDING);
    rounded
        .checked_mul(Decimal::from(scale.factor()))
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or_else(|| ConversionError::Overflow(value.to_string()))
}

/// Converts a float from free-text entry to a stored monetary integer.
///
/// The float is taken at its exact binary value before rounding, so
/// `2.675_f64` (really 2.67499999...) becomes 267 at two places.
pub fn float_to_monetary(value: f64, scale: CurrencyScale) -> Result<i64, ConversionError> {
    if !value.is_finite() {
        return Err(ConversionError::NotFinite);
    }
    let exact =
        Decimal::from_f64_retain(value).ok_or_else(|| ConversionError::Overflow(value.to_string()))?;
    decimal_to_monetary(exact, scale)
}

// =============================================================================
// Text Input & Display
// =============================================================================

/// Parses a decimal typed into a table cell.
///
/// Surrounding whitespace and thousands separators are ignored.
pub fn parse_decimal(field: &str, text: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|e| ValidationError::invalid_format(field, e))
}

/// Formats a stored monetary integer for display.
///
/// ## Example
/// ```rust
/// use podb_core::conversion::{format_currency, CurrencyScale};
///
/// let scale = CurrencyScale::default();
/// assert_eq!(format_currency(123450, scale, "R"), "R1,234.50");
/// assert_eq!(format_currency(-5, scale, "$"), "-$0.05");
/// ```
pub fn format_currency(amount: i64, scale: CurrencyScale, symbol: &str) -> String {
    let factor = scale.factor().unsigned_abs();
    let magnitude = amount.unsigned_abs();
    let whole = group_thousands(magnitude / factor);
    let sign = if amount < 0 { "-" } else { "" };

    if scale.decimal_places() > 0 {
        format!(
            "{}{}{}.{:0width$}",
            sign,
            symbol,
            whole,
            magnitude % factor,
            width = scale.decimal_places() as usize
        )
    } else {
        format!("{}{}{}", sign, symbol, whole)
    }
}

/// Formats an unrounded decimal (e.g. a line price) for display.
pub fn format_decimal_currency(
    value: Decimal,
    scale: CurrencyScale,
    symbol: &str,
) -> Result<String, ConversionError> {
    Ok(format_currency(decimal_to_monetary(value, scale)?, scale, symbol))
}

/// Formats a stored percentage, e.g. `15%`.
pub fn format_percentage(value: i64) -> String {
    format!("{}%", value)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn scale(dp: u32) -> CurrencyScale {
        CurrencyScale::new(dp).unwrap()
    }

    #[test]
    fn test_percentage_round_trip() {
        for p in 0..=99 {
            let d = percentage_to_decimal(p).unwrap();
            assert_eq!(decimal_to_percentage(d).unwrap(), p);
        }
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(
            percentage_to_decimal(-1),
            Err(ConversionError::PercentageOutOfRange(-1))
        );
        assert!(percentage_to_decimal(100).is_err());

        assert!(decimal_to_percentage(dec!(1.00)).is_err());
        assert!(decimal_to_percentage(dec!(-0.01)).is_err());
        assert!(decimal_to_percentage(dec!(0.995)).is_err());
        assert_eq!(decimal_to_percentage(dec!(0.99)).unwrap(), 99);
        assert_eq!(decimal_to_percentage(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn test_decimal_to_percentage_rounds_half_even() {
        assert_eq!(decimal_to_percentage(dec!(0.125)).unwrap(), 12);
        assert_eq!(decimal_to_percentage(dec!(0.135)).unwrap(), 14);
        assert_eq!(decimal_to_percentage(dec!(0.1251)).unwrap(), 13);
    }

    #[test]
    fn test_monetary_round_trip() {
        for dp in 0..=MAX_CURRENCY_SCALE {
            for x in [0_i64, 1, -1, 99, 100, 123_456_789, -987_654_321, i64::MAX / 100_000] {
                let d = monetary_to_decimal(x, scale(dp));
                assert_eq!(decimal_to_monetary(d, scale(dp)).unwrap(), x, "x={x} dp={dp}");
            }
        }
    }

    #[test]
    fn test_decimal_to_monetary_half_even() {
        let s = scale(2);
        assert_eq!(decimal_to_monetary(dec!(2.345), s).unwrap(), 234);
        assert_eq!(decimal_to_monetary(dec!(2.355), s).unwrap(), 236);
        assert_eq!(decimal_to_monetary(dec!(-2.345), s).unwrap(), -234);
        assert_eq!(decimal_to_monetary(dec!(230), s).unwrap(), 23000);
        assert_eq!(decimal_to_monetary(dec!(0.5), scale(0)).unwrap(), 0);
        assert_eq!(decimal_to_monetary(dec!(1.5), scale(0)).unwrap(), 2);
    }

    #[test]
    fn test_decimal_to_monetary_overflow() {
        assert!(matches!(
            decimal_to_monetary(Decimal::MAX, scale(2)),
            Err(ConversionError::Overflow(_))
        ));
    }

    #[test]
    fn test_float_to_monetary() {
        let s = scale(2);
        assert_eq!(float_to_monetary(10.99, s).unwrap(), 1099);
        assert_eq!(float_to_monetary(0.125, s).unwrap(), 12);
        // 2.675 is stored as 2.67499999... in binary
        assert_eq!(float_to_monetary(2.675, s).unwrap(), 267);
        assert_eq!(float_to_monetary(f64::NAN, s), Err(ConversionError::NotFinite));
        assert_eq!(float_to_monetary(f64::INFINITY, s), Err(ConversionError::NotFinite));
    }

    #[test]
    fn test_currency_scale_bounds() {
        assert!(CurrencyScale::new(4).is_ok());
        assert_eq!(CurrencyScale::new(5), Err(ConversionError::InvalidScale(5)));
        assert_eq!(CurrencyScale::default().factor(), 100);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("price", " 1,234.50 ").unwrap(), dec!(1234.50));
        assert_eq!(parse_decimal("price", "1e2").unwrap(), dec!(100));
        assert!(matches!(
            parse_decimal("price", "abc"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_decimal("price", "  "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(123_450, scale(2), "R"), "R1,234.50");
        assert_eq!(format_currency(1_000_000, scale(0), "¥"), "¥1,000,000");
        assert_eq!(format_currency(-5, scale(2), "$"), "-$0.05");
        assert_eq!(format_currency(7, scale(3), ""), "0.007");
        assert_eq!(format_percentage(15), "15%");
    }

    #[test]
    fn test_format_decimal_currency_rounds() {
        assert_eq!(
            format_decimal_currency(dec!(1234.565), scale(2), "R").unwrap(),
            "R1,234.56"
        );
    }
}
