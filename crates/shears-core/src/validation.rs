//! # Validation Module
//!
//! Field-level rules applied before the ledger is read or written.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: THIS MODULE                                                   │
//! │  ├── quantities, prices, codes, reasons                                │
//! │  └── runs before any lock or transaction is taken                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger arithmetic (ledger.rs)                                │
//! │  └── stock may never go negative                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on counters                                     │
//! │  ├── UNIQUE product codes                                              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shears_core::validation::{validate_product_code, validate_quantity};
//!
//! assert!(validate_product_code("POM-01").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::{ClientData, NewProduct, ProductDetails};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_STOCK_LEVEL};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_CODE_LEN: usize = 50;
const MAX_TEXT_LEN: usize = 500;
const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code (shelf label).
///
/// ## Rules
/// - Not empty, at most 50 characters
/// - Letters, numbers, hyphens and underscores only
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.len() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (product, service, client).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_required_text(field, name, MAX_NAME_LEN)
}

/// Validates the free-text reason attached to movements and refunds.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    validate_required_text("reason", reason, MAX_TEXT_LEN)
}

/// Validates the id of the already-authenticated actor.
pub fn validate_actor_id(actor_id: &str) -> ValidationResult<()> {
    validate_required_text("actor_id", actor_id, MAX_CODE_LEN * 2)
}

/// Optional free text (notes, snapshot labels): only the length is checked.
pub fn validate_optional_text(field: &str, text: Option<&str>) -> ValidationResult<()> {
    match text {
        Some(t) if t.len() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates and trims a search query. Empty is allowed (no filter).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(query.to_string())
}

/// Formal invoices need at least the buyer's name.
pub fn validate_client_data(client: &ClientData) -> ValidationResult<()> {
    validate_name("client name", &client.name)?;
    validate_optional_text("client document", client.document_id.as_deref())?;
    validate_optional_text("client address", client.address.as_deref())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or movement quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Sales are never free, and a capped price keeps
/// `price * MAX_ITEM_QUANTITY * MAX_CART_ITEMS` well inside `i64`.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::must_be_positive("price"));
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a stock figure entered by a person (initial stock, min stock,
/// physical count).
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if value > MAX_STOCK_LEVEL {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        });
    }
    Ok(())
}

/// Validates an optional movement cost.
pub fn validate_cost_cents(cost: Option<i64>) -> ValidationResult<()> {
    match cost {
        Some(c) if c < 0 => Err(ValidationError::MustNotBeNegative {
            field: "cost".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates the number of lines in a cart (1..=100).
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::required("cart items"));
    }
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }
    Ok(())
}

pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_product_code(&input.code)?;
    validate_stock_level("initial_stock", input.initial_stock)?;
    validate_stock_level("min_stock", input.min_stock)?;
    validate_price_cents(input.price_cents)
}

pub fn validate_product_details(input: &ProductDetails) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_product_code(&input.code)?;
    validate_stock_level("min_stock", input.min_stock)?;
    validate_price_cents(input.price_cents)
}

/// Both ends inclusive; `from` may not be after `to`.
pub fn validate_date_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    match (from, to) {
        (Some(f), Some(t)) if f > t => Err(ValidationError::InvertedDateRange),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_product_code() {
        assert!(validate_product_code("POM-01").is_ok());
        assert!(validate_product_code("wax_2").is_ok());
        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code("has space").is_err());
        assert!(validate_product_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_price_must_be_positive() {
        assert!(validate_price_cents(1).is_ok());
        assert!(validate_price_cents(0).is_err());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_price_capped() {
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents(MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_price_cents(i64::MAX / 2).is_err());
    }

    #[test]
    fn test_stock_level_bounds() {
        assert!(validate_stock_level("initial_stock", 0).is_ok());
        assert!(validate_stock_level("initial_stock", MAX_STOCK_LEVEL).is_ok());
        assert!(validate_stock_level("initial_stock", -1).is_err());
        assert!(matches!(
            validate_stock_level("initial_stock", i64::MAX),
            Err(ValidationError::OutOfRange { max, .. }) if max == MAX_STOCK_LEVEL
        ));
    }

    #[test]
    fn test_reason_required() {
        assert!(validate_reason("damaged in transit").is_ok());
        assert!(matches!(
            validate_reason("  "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_cart_size() {
        assert!(validate_cart_size(0).is_err());
        assert!(validate_cart_size(1).is_ok());
        assert!(validate_cart_size(100).is_ok());
        assert!(validate_cart_size(101).is_err());
    }

    #[test]
    fn test_date_range() {
        let now = Utc::now();
        assert!(validate_date_range(Some(now), Some(now)).is_ok());
        assert!(validate_date_range(None, Some(now)).is_ok());
        assert!(validate_date_range(Some(now + Duration::days(1)), Some(now)).is_err());
    }

    #[test]
    fn test_client_data_requires_name() {
        let mut client = ClientData::default();
        assert!(validate_client_data(&client).is_err());
        client.name = "Ana Ruiz".into();
        assert!(validate_client_data(&client).is_ok());
    }
}
