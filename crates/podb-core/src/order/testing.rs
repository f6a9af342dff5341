//! Shared catalog for the order module tests.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::session::Session;
use crate::types::{
    ConfigId, NewConfigSnapshot, NewProduct, NewProject, NewSupplier, OrderId, OrderStatus,
    PaymentTerms, ProductId, PurchaseOrder, SupplierId,
};

pub(crate) struct Fixture {
    pub session: Session,
    pub acme: SupplierId,
    pub boltco: SupplierId,
    pub bolt: ProductId,
    pub nut: ProductId,
    pub config: ConfigId,
    pub order_id: OrderId,
}

pub(crate) fn new_config(tax_rate: i64) -> NewConfigSnapshot {
    NewConfigSnapshot {
        company_physical_address: "12 Foundry Lane".to_string(),
        company_gps: Some("-33.92, 18.42".to_string()),
        company_postal_address: "PO Box 40".to_string(),
        company_phone: "021 555 0100".to_string(),
        company_fax: None,
        company_email: Some("buying@leal.example".to_string()),
        company_web_address: None,
        signatory_name: "J. Leal".to_string(),
        default_payment_terms: PaymentTerms::PayIn30Days,
        default_order_status: OrderStatus::Draft,
        tax_rate,
    }
}

/// Catalog without any orders.
///
/// ```text
/// Acme    B-10 Bolt 10mm   10.00  10%
///         N-10 Nut 10mm     2.50   0%
///         W-10 Washer       0.50   0%  (archived)
/// BoltCo  X-1  Bracket     50.00   0%
/// Project WH01, config at 15% tax
/// ```
pub(crate) fn catalog() -> (Session, SupplierId, SupplierId, ProductId, ProductId, ConfigId) {
    let mut session = Session::new();
    let acme = session.add_supplier(NewSupplier::new("Acme")).unwrap();
    let boltco = session.add_supplier(NewSupplier::new("BoltCo")).unwrap();

    let product = |supplier_id, part: &str, description: &str, price, discount| NewProduct {
        supplier_id,
        part_number: part.to_string(),
        description: description.to_string(),
        current_price: price,
        current_discount: discount,
    };
    let bolt = session
        .add_product(product(acme, "B-10", "Bolt 10mm", 1000, 10))
        .unwrap();
    let nut = session
        .add_product(product(acme, "N-10", "Nut 10mm", 250, 0))
        .unwrap();
    let washer = session
        .add_product(product(acme, "W-10", "Washer", 50, 0))
        .unwrap();
    session
        .add_product(product(boltco, "X-1", "Bracket", 5000, 0))
        .unwrap();

    let mut archived = session.product(washer).unwrap().clone();
    archived.archived = true;
    session.update_product(archived).unwrap();

    session
        .add_project(NewProject {
            code: "WH01".to_string(),
            description: "Warehouse fit-out".to_string(),
        })
        .unwrap();
    let config = session
        .add_config(
            new_config(15),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        )
        .unwrap();

    (session, acme, boltco, bolt, nut, config)
}

/// Catalog plus one committed, empty order for Acme.
pub(crate) fn fixture() -> Fixture {
    let (mut session, acme, boltco, bolt, nut, config) = catalog();
    let project = session.project_by_code("WH01").unwrap().id;
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    session.insert_order(PurchaseOrder {
        id: None,
        order_number: "PO00001".to_string(),
        order_date: date,
        delivery_date: date,
        delivery_address: "12 Foundry Lane".to_string(),
        delivery_gps: None,
        payment_terms: PaymentTerms::PayIn30Days,
        order_status: OrderStatus::Draft,
        notes: String::new(),
        total_excluding_tax: 0,
        total_tax: 0,
        total_including_tax: 0,
        project_id: project,
        supplier_id: acme,
        config_id: config,
    });
    let order_id = session.flush()[0];
    session.commit();

    Fixture {
        session,
        acme,
        boltco,
        bolt,
        nut,
        config,
        order_id,
    }
}
