//! # Ledger Error Types
//!
//! The error every public ledger operation returns.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerError                                                            │
//! │  ├── Domain(CoreError)   business rule failures (stock, refunds, ...)  │
//! │  ├── Storage(DbError)    SQLite failures                               │
//! │  ├── Config(String)      invalid ledger.toml / environment             │
//! │  └── Io(std::io::Error)  config file access                            │
//! │                                                                         │
//! │  error.code() → ErrorCode   stable, SCREAMING_SNAKE_CASE on the wire   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage-level not-found and duplicate errors are folded into the same
//! codes as their domain counterparts, so callers match on one code per
//! situation.

use serde::{Deserialize, Serialize};
use shears_core::CoreError;
use shears_db::DbError;
use thiserror::Error;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    ProductNotFound,
    ServiceNotFound,
    SaleNotFound,
    SnapshotNotFound,
    InvalidPaymentMethod,
    AlreadyRefunded,
    ProductInUse,
    Duplicate,
    ConfigError,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::ProductNotFound => "PRODUCT_NOT_FOUND",
            ErrorCode::ServiceNotFound => "SERVICE_NOT_FOUND",
            ErrorCode::SaleNotFound => "SALE_NOT_FOUND",
            ErrorCode::SnapshotNotFound => "SNAPSHOT_NOT_FOUND",
            ErrorCode::InvalidPaymentMethod => "INVALID_PAYMENT_METHOD",
            ErrorCode::AlreadyRefunded => "ALREADY_REFUNDED",
            ErrorCode::ProductInUse => "PRODUCT_IN_USE",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The database failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Config file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<shears_core::ValidationError> for LedgerError {
    fn from(err: shears_core::ValidationError) -> Self {
        LedgerError::Domain(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LedgerError {
    fn from(err: toml::ser::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl LedgerError {
    /// Stable classification for callers and logs.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Domain(err) => match err {
                CoreError::Validation(_) | CoreError::CartTooLarge { .. } => {
                    ErrorCode::ValidationError
                }
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::ProductNotFound(_) => ErrorCode::ProductNotFound,
                CoreError::ServiceNotFound(_) => ErrorCode::ServiceNotFound,
                CoreError::SaleNotFound(_) => ErrorCode::SaleNotFound,
                CoreError::SnapshotNotFound(_) => ErrorCode::SnapshotNotFound,
                CoreError::InvalidPaymentMethod(_) => ErrorCode::InvalidPaymentMethod,
                CoreError::AlreadyRefunded { .. } => ErrorCode::AlreadyRefunded,
                CoreError::ProductInUse { .. } => ErrorCode::ProductInUse,
            },
            LedgerError::Storage(err) => match err {
                DbError::NotFound { entity, .. } => match entity.as_str() {
                    "Product" => ErrorCode::ProductNotFound,
                    "Service" => ErrorCode::ServiceNotFound,
                    "Sale" => ErrorCode::SaleNotFound,
                    "Snapshot" => ErrorCode::SnapshotNotFound,
                    _ => ErrorCode::DatabaseError,
                },
                DbError::UniqueViolation { .. } => ErrorCode::Duplicate,
                _ => ErrorCode::DatabaseError,
            },
            LedgerError::Config(_) | LedgerError::Io(_) => ErrorCode::ConfigError,
        }
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Domain(err) => Some(err),
            _ => None,
        }
    }
}
