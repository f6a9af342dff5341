//! # Seed Data Generator
//!
//! Populates the database with a sample catalog for development.
//!
//! ## Usage
//! ```bash
//! # Default database, three sample orders
//! cargo run -p podb-db --bin seed
//!
//! # Catalog only
//! cargo run -p podb-db --bin seed -- --orders 0
//!
//! # Specify database path
//! cargo run -p podb-db --bin seed -- --db ./data/podb.db
//! ```
//!
//! ## Generated Data
//! - One supplier per entry in [`SUPPLIERS`], each with its own catalog
//! - Projects from [`PROJECTS`]
//! - One company config snapshot (15% tax)
//! - Optional draft orders built through `ActiveOrder`, so their totals go
//!   through the same recompute as hand-entered orders

use chrono::Utc;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use podb_core::order::{ActiveOrder, ProductKey};
use podb_core::types::{
    NewConfigSnapshot, NewProduct, NewProject, NewSupplier, OrderStatus, PaymentTerms,
};
use podb_core::AppConfig;
use podb_db::{settings, Database, DbConfig};

/// Suppliers and their catalogs: (part number, description, price, discount %)
const SUPPLIERS: &[(&str, &[(&str, &str, i64, i64)])] = &[
    (
        "Acme Fasteners",
        &[
            ("B-10", "Hex bolt M10 x 50", 120, 0),
            ("B-12", "Hex bolt M12 x 60", 165, 0),
            ("N-10", "Hex nut M10", 35, 0),
            ("N-12", "Hex nut M12", 45, 0),
            ("W-10", "Flat washer M10", 12, 0),
            ("AN-8", "Anchor bolt 8mm", 480, 5),
        ],
    ),
    (
        "Coastal Timber",
        &[
            ("PT-38114", "Treated pine 38x114 per m", 4250, 0),
            ("PT-38152", "Treated pine 38x152 per m", 5600, 0),
            ("PLY-18", "Shutter ply 18mm sheet", 68900, 10),
            ("OSB-15", "OSB board 15mm sheet", 41500, 10),
        ],
    ),
    (
        "Volt Electrical",
        &[
            ("CB-2.5", "Cable 2.5mm twin+earth per m", 1890, 0),
            ("DB-12", "Distribution board 12 way", 84500, 15),
            ("SW-1L", "Light switch 1 lever", 3200, 0),
            ("PL-DBL", "Double plug socket", 5400, 0),
        ],
    ),
];

const PROJECTS: &[(&str, &str)] = &[
    ("WH01", "Warehouse fit-out"),
    ("OFF02", "Office refurbishment"),
    ("MNT", "General maintenance"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut orders: usize = 3;
    let mut db_path = String::from("./podb_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PODB Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of sample orders (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./podb_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 PODB Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", orders);
    println!();

    settings::ensure_parent_dir(Path::new(&db_path))?;
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut session = db.load_session().await?;
    if session.suppliers().next().is_some() {
        println!("⚠ Database already has suppliers");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let mut products = 0;
    for (company_name, catalog) in SUPPLIERS {
        let supplier_id = session.add_supplier(NewSupplier {
            company_name: company_name.to_string(),
            phone: Some("021 555 0100".to_string()),
            ..Default::default()
        })?;

        for (part_number, description, price, discount) in catalog.iter() {
            session.add_product(NewProduct {
                supplier_id,
                part_number: part_number.to_string(),
                description: description.to_string(),
                current_price: *price,
                current_discount: *discount,
            })?;
            products += 1;
        }
    }

    for (code, description) in PROJECTS {
        session.add_project(NewProject {
            code: code.to_string(),
            description: description.to_string(),
        })?;
    }

    session.add_config(
        NewConfigSnapshot {
            company_physical_address: "12 Foundry Lane, Paarden Eiland".to_string(),
            company_gps: Some("-33.9116, 18.4772".to_string()),
            company_postal_address: "PO Box 40, Paarden Eiland".to_string(),
            company_phone: "021 555 0100".to_string(),
            company_fax: None,
            company_email: Some("buying@example.com".to_string()),
            company_web_address: None,
            signatory_name: "Procurement Officer".to_string(),
            default_payment_terms: PaymentTerms::PayIn30Days,
            default_order_status: OrderStatus::Draft,
            tax_rate: 15,
        },
        Utc::now(),
    )?;

    db.commit_session(&mut session).await?;
    println!(
        "✓ Catalog: {} suppliers, {} products, {} projects",
        SUPPLIERS.len(),
        products,
        PROJECTS.len()
    );

    // Sample orders, all for the first supplier
    let app_config = AppConfig::default();
    let (_, catalog) = SUPPLIERS[0];
    for n in 0..orders {
        let mut order = ActiveOrder::new(&mut session, &app_config)?;

        for (row, (part_number, ..)) in catalog.iter().skip(n % catalog.len()).take(3).enumerate() {
            order.select_product(&mut session, row, ProductKey::PartNumber(part_number))?;
            order.edit_quantity(&mut session, row, 10 * (row as i64 + 1))?;
        }
        order.set_notes(&mut session, "Sample order")?;

        order.pre_commit(&mut session)?;
        db.commit_session(&mut session).await?;
        order.post_commit();

        let po = order.order(&session)?;
        println!(
            "  {} - {} lines, total {}",
            po.order_number,
            session.order_lines(order.order_id()).len(),
            podb_core::conversion::format_currency(
                po.total_including_tax,
                app_config.currency_scale(),
                &app_config.locale.currency_symbol
            )
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
