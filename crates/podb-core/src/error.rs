//! # Error Types
//!
//! Domain-specific error types for podb-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  podb-core errors (this file)                                          │
//! │  ├── CoreError        - Prerequisites, lookups, row bounds             │
//! │  ├── ValidationError  - Rejected field values (recoverable)            │
//! │  └── ConversionError  - Scaled integer contract violations             │
//! │                                                                         │
//! │  podb-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recoverable vs Fatal
//! - `ValidationError` is shown to the user and the edit is discarded.
//! - Everything else fails the attempted operation and is propagated.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The catalog does not hold what an operation needs.
    ///
    /// ## When This Occurs
    /// - Creating a purchase order with no suppliers on file
    /// - Creating a purchase order with no projects on file
    /// - Creating a purchase order before any company config exists
    #[error("Prerequisite missing: {0}")]
    Prerequisite(String),

    /// The computed order number already exists.
    ///
    /// ## User Workflow
    /// ```text
    /// New Order
    ///      │
    ///      ▼
    /// count = 3  →  "PO00004"
    ///      │
    ///      ▼
    /// "PO00004" already on file (orders deleted out of sequence)
    ///      │
    ///      ▼
    /// OrderNumberInUse { order_number: "PO00004" }
    ///      │
    ///      ▼
    /// No editing session is opened
    /// ```
    #[error("The calculated order number ({order_number}) has been used before")]
    OrderNumberInUse { order_number: String },

    /// A natural-key or id lookup found nothing.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// A buffer row index is past the end.
    #[error("Row {row} is out of range (rows: {len})")]
    RowOutOfRange { row: usize, len: usize },

    /// Application configuration is invalid.
    #[error("Invalid config setting: {0}")]
    Config(String),

    /// Scaled value conversion failed (wraps ConversionError).
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and key.
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are the "recovered locally" class: the edit is dropped, the row or
/// field keeps its previous value, and the message is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unparseable number typed into a cell).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value.
    ///
    /// ## When This Occurs
    /// - Selecting a product already listed on the purchase order
    /// - Adding a supplier whose company name is taken
    #[error("The {field} '{value}' is already in use")]
    Duplicate { field: String, value: String },

    /// Field is computed and cannot be typed into.
    #[error("{field} is read-only")]
    ReadOnly { field: String },

    /// Edit addressed a buffer row that does not exist.
    #[error("Row {row} does not exist (rows: {len})")]
    NoSuchRow { row: usize, len: usize },

    /// Value would push a computed total past what can be stored.
    #[error("{field} would be too large")]
    TooLarge { field: String },

    /// Value is not in the active supplier's catalog.
    #[error("{field} '{value}' is not in the supplier's catalog")]
    NotInCatalog { field: String, value: String },
}

impl ValidationError {
    pub(crate) fn invalid_format(field: &str, reason: impl ToString) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Conversion Error
// =============================================================================

/// Violations of the scaled integer conversion contract.
///
/// Callers are expected to pre-validate UI input, so these are propagated
/// as contract violations rather than swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Integer percentage outside 0..=99.
    #[error("Percentage {0} is out of range. The valid range is 0 to 99, inclusive")]
    PercentageOutOfRange(i64),

    /// Decimal percentage outside 0.00..=0.99.
    #[error("Percentage {0} is out of range. The valid range is 0.00 to 0.99, inclusive")]
    DecimalPercentageOutOfRange(String),

    /// Currency scale outside 0..=4.
    #[error("Currency decimal places must be between 0 and 4, got {0}")]
    InvalidScale(u32),

    /// Result does not fit the persisted integer.
    #[error("Value {0} does not fit a scaled integer")]
    Overflow(String),

    /// NaN or infinity from free-text entry.
    #[error("Value is not a finite number")]
    NotFinite,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
