//! # Demo Store Seeder
//!
//! Populates a ledger with a small barbershop and a day of trading.
//!
//! ## Usage
//! ```bash
//! # Seed ./shears_dev.db
//! cargo run -p shears-ledger --bin seed
//!
//! # Specify database path and a config file
//! cargo run -p shears-ledger --bin seed -- --db ./data/ledger.db --config ./ledger.toml
//! ```
//!
//! ## What Gets Created
//! - Retail products (pomades, oils, shampoos) with opening stock
//! - Services (haircut, beard trim, hot towel shave)
//! - A delivery entry and a breakage exit
//! - Several carts, one with formal client data
//! - One refund and one physical count
//! - A closing snapshot, followed by a reconciliation report

use std::env;
use std::path::PathBuf;

use shears_core::cart::{CartLineRequest, CartRequest};
use shears_core::reconcile::{ReconcileMode, ReconcileOutcome};
use shears_core::{ClientData, LineKind, MovementKind, NewProduct, StockAdjustment};
use shears_ledger::telemetry::init_tracing;
use shears_ledger::{InvoiceFilter, LedgerConfig, LedgerService};

/// (code, name, category, opening stock, reorder at, price)
const PRODUCTS: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("POM-CLAY", "Matte Clay Pomade", "styling", 24, 6, 1800),
    ("POM-SHINE", "High Shine Pomade", "styling", 18, 6, 1650),
    ("WAX-FIBER", "Fiber Wax", "styling", 12, 4, 1500),
    ("OIL-BEARD", "Cedar Beard Oil", "beard", 15, 5, 2200),
    ("BALM-BEARD", "Beard Balm", "beard", 10, 3, 1900),
    ("SHA-MINT", "Mint Shampoo", "hair care", 20, 5, 1400),
    ("CON-ARGAN", "Argan Conditioner", "hair care", 16, 5, 1450),
    ("COMB-WOOD", "Sandalwood Comb", "tools", 30, 8, 900),
];

/// (name, price)
const SERVICES: &[(&str, i64)] = &[
    ("Haircut", 2500),
    ("Skin Fade", 3000),
    ("Beard Trim", 1500),
    ("Hot Towel Shave", 2800),
];

const ACTOR: &str = "seed";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path = PathBuf::from("./shears_dev.db");
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Shears POS Demo Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./shears_dev.db)");
                println!("  -c, --config <PATH>   ledger.toml to read store and payment settings from");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => LedgerConfig::load(Some(path))?,
        None => LedgerConfig::default(),
    };
    config.database.path = db_path;

    println!("Shears POS Demo Seeder");
    println!("======================");
    println!("Database: {}", config.database.path.display());
    println!("Store:    {}", config.store.name);
    println!();

    let ledger = LedgerService::open(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = ledger.list_products().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for (code, name, category, stock, min_stock, price) in PRODUCTS {
        let product = ledger
            .create_product(NewProduct {
                name: name.to_string(),
                code: code.to_string(),
                category: Some(category.to_string()),
                initial_stock: *stock,
                min_stock: *min_stock,
                price_cents: *price,
            })
            .await?;
        product_ids.push((product.id, *price));
    }
    println!("✓ Created {} products", product_ids.len());

    let mut service_ids = Vec::with_capacity(SERVICES.len());
    for (name, price) in SERVICES {
        let service = ledger.create_service(name, *price).await?;
        service_ids.push((service.id, *price));
    }
    println!("✓ Created {} services", service_ids.len());

    // Stock movements
    let (clay_id, _) = &product_ids[0];
    let (comb_id, _) = &product_ids[7];
    ledger
        .adjust_stock(StockAdjustment {
            product_id: clay_id.clone(),
            kind: MovementKind::Entry,
            quantity: 12,
            reason: "Supplier delivery".into(),
            cost_cents: Some(9600),
            payment_method: Some("transfer".into()),
            actor_id: ACTOR.into(),
        })
        .await?;
    ledger
        .adjust_stock(StockAdjustment {
            product_id: comb_id.clone(),
            kind: MovementKind::Exit,
            quantity: 2,
            reason: "Broken teeth".into(),
            cost_cents: None,
            payment_method: None,
            actor_id: ACTOR.into(),
        })
        .await?;
    println!("✓ Recorded 2 stock movements");

    // Carts
    let methods = ["cash", "card", "transfer"];
    let mut refundable = None;
    for n in 0..6usize {
        let (service_id, service_price) = &service_ids[n % service_ids.len()];
        let (product_id, product_price) = &product_ids[(n * 3) % product_ids.len()];

        let cart = CartRequest {
            barber_id: Some(format!("barber-{}", n % 2 + 1)),
            client_data: (n == 4).then(|| ClientData {
                name: "Dana Ruiz".into(),
                document_id: Some("900123456".into()),
                email: Some("dana@example.com".into()),
                phone: None,
                address: None,
            }),
            lines: vec![
                CartLineRequest {
                    kind: LineKind::Service,
                    item_id: service_id.clone(),
                    quantity: 1,
                    unit_price_cents: *service_price,
                    payment_method: methods[n % methods.len()].into(),
                    client_data: None,
                },
                CartLineRequest {
                    kind: LineKind::Product,
                    item_id: product_id.clone(),
                    quantity: (n as i64 % 3) + 1,
                    unit_price_cents: *product_price,
                    payment_method: "cash".into(),
                    client_data: None,
                },
            ],
        };

        let settled = ledger.create_cart_sale(cart).await?;
        if n == 2 {
            refundable = settled
                .records
                .iter()
                .find(|r| r.line_kind == LineKind::Product)
                .map(|r| r.id.clone());
        }
    }
    println!("✓ Settled 6 carts");

    if let Some(sale_id) = refundable {
        ledger.refund_sale(&sale_id, "Wrong scent").await?;
        println!("✓ Refunded 1 sale line");
    }

    let (beard_oil_id, _) = &product_ids[3];
    let expected = ledger.get_available(beard_oil_id).await?;
    ledger
        .record_manual_count(beard_oil_id, expected - 1, Some("Shelf count".into()), ACTOR)
        .await?;
    println!("✓ Recorded 1 physical count");

    let snapshot = ledger
        .create_snapshot(ACTOR, Some("End of demo day".into()))
        .await?;
    println!("✓ Snapshot {} ({} items)", snapshot.id, snapshot.items.len());

    // Summary
    println!();
    let invoices = ledger.list_invoices(InvoiceFilter::default()).await?;
    println!("Invoices: {}", invoices.len());
    for invoice in invoices.iter().take(3) {
        println!(
            "  {} {:?} total {} (tax {}){}",
            invoice.id,
            invoice.kind,
            shears_core::Money::from_cents(invoice.total_cents),
            shears_core::Money::from_cents(invoice.tax_cents),
            if invoice.has_refunds { " [refunds]" } else { "" }
        );
    }

    let low = ledger.list_low_stock().await?;
    println!("Low stock: {}", low.len());

    println!();
    println!("Reconciliation report:");
    match ledger.reconcile(ReconcileMode::Report).await? {
        ReconcileOutcome::Report { drift, counts } => {
            println!("  Drifting products: {}", drift.len());
            for gap in &counts {
                println!(
                    "  Count gap: {} counted {} expected {} ({:+})",
                    gap.product_name, gap.real_stock, gap.expected_stock, gap.difference
                );
            }
        }
        ReconcileOutcome::Fixed { .. } => {}
    }

    println!();
    println!("✓ Seed complete! Ledger version {}", ledger.ledger_version().await?);

    ledger.close().await;
    Ok(())
}
