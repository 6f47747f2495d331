//! # Storage Errors
//!
//! Everything the SQLite layer can report back to the ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──► DbError ──► LedgerError::Storage ──► caller           │
//! │                                                                         │
//! │  ErrorKind::UniqueViolation      → UniqueViolation { field, value }    │
//! │  ErrorKind::ForeignKeyViolation  → ForeignKeyViolation                 │
//! │  ErrorKind::CheckViolation       → ConstraintViolation                 │
//! │  PoolTimedOut / PoolClosed       → PoolExhausted / ConnectionFailed    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for `entity` with this id. `entity` is one of
    /// `Product`, `Service`, `Sale`, `Snapshot`.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: String, id: String },

    /// `field` is `table.column`, e.g. `products.code`.
    #[error("{field} '{value}' is already taken")]
    UniqueViolation { field: String, value: String },

    /// A history row points at a product or service that is gone.
    #[error("Referenced row missing: {message}")]
    ForeignKeyViolation { message: String },

    /// Stock counters are `CHECK`ed non-negative in the schema; hitting this
    /// means a write slipped past the ledger's own checks.
    #[error("Schema check rejected write: {message}")]
    ConstraintViolation { message: String },

    #[error("Cannot open ledger database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Statement failed: {0}")]
    QueryFailed(String),

    /// `client_data` or snapshot JSON could not be encoded or decoded.
    #[error("Bad stored JSON: {0}")]
    Serialization(String),

    #[error("Timed out waiting for a database connection")]
    PoolExhausted,

    #[error("Unexpected storage error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// SQLite names the offending column after the colon:
/// `UNIQUE constraint failed: products.code`.
fn constraint_target(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // The offending value is not in SQLite's message; callers
                    // that know it rebuild the error with `duplicate`.
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: constraint_target(&message),
                        value: String::new(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::ConstraintViolation { message }
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".into()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: products.code"),
            "products.code"
        );
        assert_eq!(constraint_target("no colon here"), "no colon here");
    }

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Sale", "s-9");
        assert_eq!(err.to_string(), "Sale s-9 does not exist");
    }
}
