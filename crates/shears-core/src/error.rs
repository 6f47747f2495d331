//! # Error Types
//!
//! Domain-specific error types for shears-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shears-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shears-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  shears-ledger errors                                                  │
//! │  └── LedgerError      - Core + Db + Config, with a stable ErrorCode    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation that returns one of these has left the ledger exactly as
//! it found it.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id does not exist in the ledger.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Service id does not exist, or the service was deactivated.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Sale record id does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Inventory snapshot id does not exist.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Not enough stock to complete a sale or an outbound movement.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: [Pomade x5, Comb x1]
    ///      │
    ///      ▼
    /// Check stock: Pomade expected=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Pomade", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole cart rejected, nothing committed
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Payment method is not in the configured catalog, or is disabled.
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// Sale record has already been refunded.
    #[error("Sale {sale_id} has already been refunded")]
    AlreadyRefunded { sale_id: String },

    /// Product still has sale records or stock movements pointing at it.
    #[error("Product {product_id} has {sale_count} sales and {movement_count} movements and cannot be deleted")]
    ProductInUse {
        product_id: String,
        sale_count: i64,
        movement_count: i64,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for the stock failure raised by ledger arithmetic.
    pub fn insufficient_stock(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        available: i64,
        requested: i64,
    ) -> Self {
        CoreError::InsufficientStock {
            product_id: product_id.into(),
            product_name: product_name.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any ledger state is read.
#[derive(Debug, Error)]
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, bad code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A total left the representable range.
    #[error("{field} is too large")]
    Overflow { field: String },

    /// Date range with `from` after `to`.
    #[error("date range start is after its end")]
    InvertedDateRange,
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive { field: field.into() }
    }

    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow { field: field.into() }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::insufficient_stock("p-1", "Matte Pomade", 3, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Matte Pomade: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: reason is required");
    }

    #[test]
    fn test_already_refunded_message() {
        let err = CoreError::AlreadyRefunded {
            sale_id: "s-9".to_string(),
        };
        assert_eq!(err.to_string(), "Sale s-9 has already been refunded");
    }
}
