//! Concurrent writers against a file-backed, multi-connection pool.

use std::time::Duration;

use shears_core::cart::{CartLineRequest, CartRequest};
use shears_core::reconcile::ReconcileMode;
use shears_core::{LineKind, MovementKind, NewProduct, StockAdjustment};
use shears_db::{Database, DbConfig};
use shears_ledger::{ErrorCode, LedgerConfig, LedgerService};
use tempfile::TempDir;

async fn file_ledger() -> (LedgerService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("ledger.db"))
        .max_connections(4)
        .busy_timeout(Duration::from_secs(10));
    let db = Database::new(config).await.unwrap();
    (LedgerService::with_database(db, &LedgerConfig::default()), dir)
}

async fn stocked(ledger: &LedgerService, code: &str, initial_stock: i64) -> String {
    ledger
        .create_product(NewProduct {
            name: format!("Product {code}"),
            code: code.to_string(),
            category: None,
            initial_stock,
            min_stock: 0,
            price_cents: 1500,
        })
        .await
        .unwrap()
        .id
}

fn one_unit(product_id: &str, barber: &str) -> CartRequest {
    CartRequest {
        barber_id: Some(barber.to_string()),
        client_data: None,
        lines: vec![CartLineRequest {
            kind: LineKind::Product,
            item_id: product_id.to_string(),
            quantity: 1,
            unit_price_cents: 1500,
            payment_method: "card".into(),
            client_data: None,
        }],
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_registers_race_for_the_last_unit() {
    let (ledger, _dir) = file_ledger().await;
    let last = stocked(&ledger, "LAST", 1).await;

    let first = tokio::spawn({
        let ledger = ledger.clone();
        let cart = one_unit(&last, "barber-1");
        async move { ledger.create_cart_sale(cart).await }
    });
    let second = tokio::spawn({
        let ledger = ledger.clone();
        let cart = one_unit(&last, "barber-2");
        async move { ledger.create_cart_sale(cart).await }
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let won = results.iter().filter(|r| r.is_ok()).count();
    let lost: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(|e| e.code())
        .collect();

    assert_eq!(won, 1);
    assert_eq!(lost, vec![ErrorCode::InsufficientStock]);
    assert_eq!(ledger.get_available(&last).await.unwrap(), 0);
    assert_eq!(ledger.list_sales(None, None).await.unwrap().len(), 1);

    ledger.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_writers_keep_history_consistent() {
    let (ledger, _dir) = file_ledger().await;
    let pomade = stocked(&ledger, "POM", 40).await;
    let oil = stocked(&ledger, "OIL", 40).await;

    let mut tasks = Vec::new();
    for n in 0..12 {
        let ledger = ledger.clone();
        let (pomade, oil) = (pomade.clone(), oil.clone());
        tasks.push(tokio::spawn(async move {
            match n % 3 {
                0 => {
                    // Both products in one cart, in alternating order.
                    let (a, b) = if n % 2 == 0 { (&pomade, &oil) } else { (&oil, &pomade) };
                    let mut cart = one_unit(a, "barber-1");
                    cart.lines.extend(one_unit(b, "barber-1").lines);
                    ledger.create_cart_sale(cart).await.map(|_| ())
                }
                1 => {
                    match ledger.create_cart_sale(one_unit(&oil, "barber-2")).await {
                        Ok(settled) => ledger
                            .refund_sale(&settled.records[0].id, "changed mind")
                            .await
                            .map(|_| ()),
                        Err(err) => Err(err),
                    }
                }
                _ => ledger
                    .adjust_stock(StockAdjustment {
                        product_id: pomade.clone(),
                        kind: MovementKind::Entry,
                        quantity: 2,
                        reason: "delivery".into(),
                        cost_cents: None,
                        payment_method: None,
                        actor_id: "owner".into(),
                    })
                    .await
                    .map(|_| ()),
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // 4 two-product carts, 4 refunded oil sales, 4 pomade entries of 2.
    assert_eq!(ledger.get_available(&pomade).await.unwrap(), 40 - 4 + 8);
    assert_eq!(ledger.get_available(&oil).await.unwrap(), 40 - 4);

    let report = ledger.reconcile(ReconcileMode::Report).await.unwrap();
    assert_eq!(report.issue_count(), 0);

    ledger.close().await;
}
