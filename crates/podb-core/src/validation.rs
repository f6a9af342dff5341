//! # Validation Module
//!
//! Field rules shared by the session (catalog maintenance), the ledger
//! (order fields) and the line-item buffer (quantities).
//!
//! ## Field Sizes
//! ```text
//! ┌───────────────────────────┬────────┐
//! │ Field                     │ Max    │
//! ├───────────────────────────┼────────┤
//! │ company name              │ 50     │
//! │ description               │ 255    │
//! │ email address             │ 100    │
//! │ GPS coordinates           │ 100    │
//! │ order number              │ 8      │
//! │ part number               │ 100    │
//! │ person name               │ 100    │
//! │ phone number              │ 20     │
//! │ project code              │ 6      │
//! │ tax number                │ 50     │
//! │ web address               │ 100    │
//! └───────────────────────────┴────────┘
//! ```
//! The same limits are the column sizes in `migrations/sqlite`.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const COMPANY_NAME_LENGTH: usize = 50;
pub const DESCRIPTION_LENGTH: usize = 255;
pub const EMAIL_ADDRESS_LENGTH: usize = 100;
pub const GPS_COORDINATES_LENGTH: usize = 100;
pub const ORDER_NUMBER_LENGTH: usize = 8;
pub const PART_NUMBER_LENGTH: usize = 100;
pub const PERSON_NAME_LENGTH: usize = 100;
pub const PHONE_NUMBER_LENGTH: usize = 20;
pub const PROJECT_CODE_LENGTH: usize = 6;
pub const TAX_NUMBER_LENGTH: usize = 50;
pub const WEB_ADDRESS_LENGTH: usize = 100;

/// Digits appended to the prefix by order numbering.
pub const ORDER_NUMBER_DIGITS: usize = 5;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field: non-blank and within `max` characters.
///
/// ## Example
/// ```rust
/// use podb_core::validation::{validate_required, PROJECT_CODE_LENGTH};
///
/// assert!(validate_required("project code", "WH01", PROJECT_CODE_LENGTH).is_ok());
/// assert!(validate_required("project code", "  ", PROJECT_CODE_LENGTH).is_err());
/// assert!(validate_required("project code", "TOOLONG", PROJECT_CODE_LENGTH).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    validate_length(field, value, max)
}

/// Validates that a text field fits its column.
pub fn validate_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates an optional text field if present.
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) => validate_length(field, v, max),
        None => Ok(()),
    }
}

/// Validates the configured order number prefix.
///
/// The prefix plus five digits must fit the order number column.
pub fn validate_order_number_prefix(prefix: &str) -> ValidationResult<()> {
    validate_required(
        "order number prefix",
        prefix,
        ORDER_NUMBER_LENGTH - ORDER_NUMBER_DIGITS,
    )
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a stored percentage (discount or tax rate).
pub fn validate_percentage(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=99).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 99,
        });
    }
    Ok(())
}

/// Validates a catalog price. Prices may be zero but never negative.
pub fn validate_price(value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Uniqueness
// =============================================================================

/// Fails if `value` is already taken by one of `existing`.
pub fn validate_unique<'a>(
    field: &str,
    value: &str,
    mut existing: impl Iterator<Item = &'a str>,
) -> ValidationResult<()> {
    if existing.any(|taken| taken == value) {
        return Err(ValidationError::Duplicate {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("company name", "Acme", COMPANY_NAME_LENGTH).is_ok());
        assert!(validate_required("company name", "", COMPANY_NAME_LENGTH).is_err());
        assert!(validate_required("company name", &"A".repeat(51), COMPANY_NAME_LENGTH).is_err());
        assert!(validate_required("company name", &"A".repeat(50), COMPANY_NAME_LENGTH).is_ok());
    }

    #[test]
    fn test_validate_length_counts_chars() {
        // Multi-byte characters count once
        assert!(validate_length("project code", "ÄÖÜÄÖÜ", PROJECT_CODE_LENGTH).is_ok());
    }

    #[test]
    fn test_validate_order_number_prefix() {
        assert!(validate_order_number_prefix("PO").is_ok());
        assert!(validate_order_number_prefix("ABC").is_ok());
        assert!(validate_order_number_prefix("ABCD").is_err());
        assert!(validate_order_number_prefix(" ").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("discount", 0).is_ok());
        assert!(validate_percentage("discount", 99).is_ok());
        assert!(validate_percentage("discount", 100).is_err());
        assert!(validate_percentage("tax rate", -1).is_err());
    }

    #[test]
    fn test_validate_unique() {
        let taken = ["BOLT-10", "NUT-10"];
        assert!(validate_unique("part number", "WASHER", taken.into_iter()).is_ok());
        assert_eq!(
            validate_unique("part number", "NUT-10", taken.into_iter()),
            Err(ValidationError::Duplicate {
                field: "part number".to_string(),
                value: "NUT-10".to_string(),
            })
        );
    }
}
