//! Fixtures shared by the unit tests.

use shears_core::cart::CartLineRequest;
use shears_core::{LineKind, NewProduct, PaymentMethodCatalog};
use shears_db::{Database, DbConfig};

use crate::config::LedgerConfig;
use crate::context::LedgerContext;

/// Cash, card and transfer, all enabled.
pub fn catalog() -> PaymentMethodCatalog {
    LedgerConfig::default().payment_catalog()
}

pub async fn context() -> LedgerContext {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    LedgerContext::new(db, catalog())
}

/// Reorder threshold 2, price 10.00.
pub fn new_product(code: &str, name: &str, initial_stock: i64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        code: code.to_string(),
        category: None,
        initial_stock,
        min_stock: 2,
        price_cents: 1000,
    }
}

pub fn product_line(product_id: &str, quantity: i64, unit_price_cents: i64, method: &str) -> CartLineRequest {
    CartLineRequest {
        kind: LineKind::Product,
        item_id: product_id.to_string(),
        quantity,
        unit_price_cents,
        payment_method: method.to_string(),
        client_data: None,
    }
}

pub fn service_line(service_id: &str, unit_price_cents: i64, method: &str) -> CartLineRequest {
    CartLineRequest {
        kind: LineKind::Service,
        item_id: service_id.to_string(),
        quantity: 1,
        unit_price_cents,
        payment_method: method.to_string(),
        client_data: None,
    }
}
