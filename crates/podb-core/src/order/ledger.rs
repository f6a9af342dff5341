//! # Purchase-Order Ledger
//!
//! Creates purchase orders and writes their fields through the session.
//!
//! Every accepted write that changes a value queues a
//! [`LedgerEvent::FieldChanged`]. Writes of an equal value are no-ops and
//! queue nothing.
//!
//! ## Order Numbering
//! ```text
//! orders on file (pending included) = 3
//!            │
//!            ▼
//! "{prefix}{count + 1:05}"  →  "PO00004"
//!            │
//!            ├── free   → used
//!            └── taken  → OrderNumberInUse (nothing is created)
//! ```
//! Deleting orders out of sequence can make the computed number collide
//! with one already on file. That is reported, not worked around.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::TaxRateSource;
use crate::conversion::percentage_to_decimal;
use crate::error::{CoreError, CoreResult};
use crate::order::events::{FieldName, LedgerEvent};
use crate::session::{PendingOrderKey, Session};
use crate::types::{ConfigId, ConfigSnapshot, OrderId, OrderStatus, PaymentTerms, PurchaseOrder};
use crate::validation::{
    validate_optional, validate_order_number_prefix, validate_required, validate_unique,
    GPS_COORDINATES_LENGTH, ORDER_NUMBER_DIGITS, ORDER_NUMBER_LENGTH,
};

/// A typed value for one purchase order field.
///
/// Project and supplier are given by natural key (code, company name) the
/// way the order form offers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderField {
    OrderNumber(String),
    OrderDate(NaiveDate),
    DeliveryDate(NaiveDate),
    DeliveryAddress(String),
    DeliveryGps(Option<String>),
    PaymentTerms(PaymentTerms),
    OrderStatus(OrderStatus),
    Notes(String),
    TotalExcludingTax(i64),
    TotalTax(i64),
    TotalIncludingTax(i64),
    Project(String),
    Supplier(String),
    Config(ConfigId),
}

impl OrderField {
    pub fn name(&self) -> FieldName {
        match self {
            OrderField::OrderNumber(_) => FieldName::OrderNumber,
            OrderField::OrderDate(_) => FieldName::OrderDate,
            OrderField::DeliveryDate(_) => FieldName::DeliveryDate,
            OrderField::DeliveryAddress(_) => FieldName::DeliveryAddress,
            OrderField::DeliveryGps(_) => FieldName::DeliveryGps,
            OrderField::PaymentTerms(_) => FieldName::PaymentTerms,
            OrderField::OrderStatus(_) => FieldName::OrderStatus,
            OrderField::Notes(_) => FieldName::Notes,
            OrderField::TotalExcludingTax(_) => FieldName::TotalExcludingTax,
            OrderField::TotalTax(_) => FieldName::TotalTax,
            OrderField::TotalIncludingTax(_) => FieldName::TotalIncludingTax,
            OrderField::Project(_) => FieldName::Project,
            OrderField::Supplier(_) => FieldName::Supplier,
            OrderField::Config(_) => FieldName::Config,
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Writes purchase order records and reports what changed.
#[derive(Debug, Default)]
pub struct Ledger {
    events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next order number: `{prefix}{count + 1:05}`.
    ///
    /// ## Example
    /// ```rust
    /// use podb_core::order::Ledger;
    /// use podb_core::session::Session;
    ///
    /// let session = Session::new();
    /// assert_eq!(Ledger::next_order_number(&session, "PO").unwrap(), "PO00001");
    /// ```
    pub fn next_order_number(session: &Session, prefix: &str) -> CoreResult<String> {
        validate_order_number_prefix(prefix)?;
        let number = format!(
            "{}{:0width$}",
            prefix,
            session.order_count() + 1,
            width = ORDER_NUMBER_DIGITS
        );

        if session.order_number_in_use(&number) {
            return Err(CoreError::OrderNumberInUse {
                order_number: number,
            });
        }
        Ok(number)
    }

    /// Queues a new order dated today. See [`create_on`](Self::create_on).
    pub fn create(&mut self, session: &mut Session, prefix: &str) -> CoreResult<PendingOrderKey> {
        self.create_on(session, prefix, Local::now().date_naive())
    }

    /// Queues a new order with defaults from the catalog and latest config.
    ///
    /// ## Defaults
    /// - Supplier and project: the first on file by id
    /// - Delivery address and GPS: the company's, from the latest config
    /// - Order and delivery date: `today`
    /// - Payment terms and status: the latest config's defaults
    /// - Notes empty, totals zero
    ///
    /// Fails without touching the session if a prerequisite is missing or
    /// the order number is taken.
    pub fn create_on(
        &mut self,
        session: &mut Session,
        prefix: &str,
        today: NaiveDate,
    ) -> CoreResult<PendingOrderKey> {
        let supplier_id = session.suppliers().next().map(|s| s.id).ok_or_else(|| {
            CoreError::Prerequisite(
                "A purchase order requires at least one supplier, but none were found".into(),
            )
        })?;
        let project_id = session.projects().next().map(|p| p.id).ok_or_else(|| {
            CoreError::Prerequisite(
                "A purchase order requires at least one project, but none were found".into(),
            )
        })?;
        let config = session.latest_config().cloned().ok_or_else(|| {
            CoreError::Prerequisite(
                "A purchase order requires the company configuration, but none was found".into(),
            )
        })?;
        let order_number = Self::next_order_number(session, prefix)?;

        info!(order_number = %order_number, supplier_id = %supplier_id, "Creating purchase order");
        Ok(session.insert_order(PurchaseOrder {
            id: None,
            order_number,
            order_date: today,
            delivery_date: today,
            delivery_address: config.company_physical_address,
            delivery_gps: config.company_gps,
            payment_terms: config.default_payment_terms,
            order_status: config.default_order_status,
            notes: String::new(),
            total_excluding_tax: 0,
            total_tax: 0,
            total_including_tax: 0,
            project_id,
            supplier_id,
            config_id: config.id,
        }))
    }

    /// Writes one field. Returns `true` if the stored value changed.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown order, project code, supplier name or config
    /// - `Validation` for an order number that is blank, too long or taken,
    ///   or GPS text that is too long
    pub fn set_field(
        &mut self,
        session: &mut Session,
        order_id: OrderId,
        field: OrderField,
    ) -> CoreResult<bool> {
        if session.order(order_id).is_none() {
            return Err(CoreError::not_found("Purchase order", order_id));
        }
        let name = field.name();

        // Resolve references before taking the mutable borrow
        let project_id = match &field {
            OrderField::Project(code) => Some(
                session
                    .project_by_code(code)
                    .ok_or_else(|| CoreError::not_found("Project", code))?
                    .id,
            ),
            _ => None,
        };
        let supplier_id = match &field {
            OrderField::Supplier(company_name) => Some(
                session
                    .supplier_by_name(company_name)
                    .ok_or_else(|| CoreError::not_found("Supplier", company_name))?
                    .id,
            ),
            _ => None,
        };
        match &field {
            OrderField::OrderNumber(number) => {
                validate_required("order number", number, ORDER_NUMBER_LENGTH)?;
                validate_unique(
                    "order number",
                    number,
                    session
                        .orders()
                        .filter(|o| o.id != Some(order_id))
                        .map(|o| o.order_number.as_str()),
                )?;
            }
            OrderField::DeliveryGps(gps) => {
                validate_optional("GPS coordinates", gps.as_deref(), GPS_COORDINATES_LENGTH)?;
            }
            OrderField::Config(id) if session.config(*id).is_none() => {
                return Err(CoreError::not_found("Configuration", id));
            }
            _ => {}
        }

        let order = session
            .order_mut(order_id)
            .ok_or_else(|| CoreError::not_found("Purchase order", order_id))?;

        let changed = match field {
            OrderField::OrderNumber(v) => replace(&mut order.order_number, v),
            OrderField::OrderDate(v) => replace(&mut order.order_date, v),
            OrderField::DeliveryDate(v) => replace(&mut order.delivery_date, v),
            OrderField::DeliveryAddress(v) => replace(&mut order.delivery_address, v),
            OrderField::DeliveryGps(v) => replace(&mut order.delivery_gps, v),
            OrderField::PaymentTerms(v) => replace(&mut order.payment_terms, v),
            OrderField::OrderStatus(v) => replace(&mut order.order_status, v),
            OrderField::Notes(v) => replace(&mut order.notes, v),
            OrderField::TotalExcludingTax(v) => replace(&mut order.total_excluding_tax, v),
            OrderField::TotalTax(v) => replace(&mut order.total_tax, v),
            OrderField::TotalIncludingTax(v) => replace(&mut order.total_including_tax, v),
            OrderField::Project(_) => match project_id {
                Some(id) => replace(&mut order.project_id, id),
                None => false,
            },
            OrderField::Supplier(_) => match supplier_id {
                Some(id) => replace(&mut order.supplier_id, id),
                None => false,
            },
            OrderField::Config(v) => replace(&mut order.config_id, v),
        };

        if changed {
            debug!(order_id = %order_id, field = ?name, "Purchase order field changed");
            self.events.push(LedgerEvent::FieldChanged {
                order: order_id,
                field: name,
            });
        }
        Ok(changed)
    }

    /// Deletes an order and its lines.
    pub fn delete(&mut self, session: &mut Session, order_id: OrderId) -> CoreResult<()> {
        session.delete_order(order_id).map(|_| ())
    }

    /// Flushed orders in id order.
    pub fn orders(session: &Session) -> impl Iterator<Item = &PurchaseOrder> {
        session.orders()
    }

    pub fn get(session: &Session, order_id: OrderId) -> CoreResult<&PurchaseOrder> {
        session
            .order(order_id)
            .ok_or_else(|| CoreError::not_found("Purchase order", order_id))
    }

    /// The snapshot whose tax rate prices `order_id`.
    pub fn tax_config(
        session: &Session,
        order_id: OrderId,
        source: TaxRateSource,
    ) -> CoreResult<&ConfigSnapshot> {
        match source {
            TaxRateSource::Latest => session.latest_config().ok_or_else(|| {
                CoreError::Prerequisite("No company configuration has been saved".into())
            }),
            TaxRateSource::OrderSnapshot => {
                let config_id = Self::get(session, order_id)?.config_id;
                session
                    .config(config_id)
                    .ok_or_else(|| CoreError::not_found("Configuration", config_id))
            }
        }
    }

    /// Tax rate for `order_id` as a decimal fraction.
    pub fn tax_rate_for(
        session: &Session,
        order_id: OrderId,
        source: TaxRateSource,
    ) -> CoreResult<Decimal> {
        let config = Self::tax_config(session, order_id, source)?;
        Ok(percentage_to_decimal(config.tax_rate)?)
    }

    pub(crate) fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::order::testing::{catalog, fixture, new_config};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_create_uses_defaults() {
        let (mut session, acme, _, _, _, config) = catalog();
        let mut ledger = Ledger::new();

        let key = ledger.create_on(&mut session, "PO", today()).unwrap();
        session.flush();
        let order = session.order(session.resolve_pending(key).unwrap()).unwrap();

        assert_eq!(order.order_number, "PO00001");
        assert_eq!(order.supplier_id, acme);
        assert_eq!(order.config_id, config);
        assert_eq!(order.delivery_address, "12 Foundry Lane");
        assert_eq!(order.delivery_gps.as_deref(), Some("-33.92, 18.42"));
        assert_eq!(order.order_date, today());
        assert_eq!(order.payment_terms, PaymentTerms::PayIn30Days);
        assert_eq!(order.total_including_tax, 0);
        assert!(ledger.take_events().is_empty());
    }

    #[test]
    fn test_create_numbers_count_pending_orders() {
        let (mut session, ..) = catalog();
        let mut ledger = Ledger::new();

        ledger.create_on(&mut session, "PO", today()).unwrap();
        assert_eq!(Ledger::next_order_number(&session, "PO").unwrap(), "PO00002");
        assert_eq!(Ledger::next_order_number(&session, "ORD").unwrap(), "ORD00002");
    }

    #[test]
    fn test_create_requires_supplier() {
        let mut session = Session::new();
        let mut ledger = Ledger::new();

        let err = ledger.create_on(&mut session, "PO", today()).unwrap_err();
        assert!(matches!(err, CoreError::Prerequisite(_)));
        assert_eq!(session.order_count(), 0);
    }

    #[test]
    fn test_create_requires_config() {
        let mut session = Session::new();
        session
            .add_supplier(crate::types::NewSupplier::new("Acme"))
            .unwrap();
        session
            .add_project(crate::types::NewProject {
                code: "WH01".to_string(),
                description: String::new(),
            })
            .unwrap();

        let err = Ledger::new().create_on(&mut session, "PO", today()).unwrap_err();
        assert!(matches!(err, CoreError::Prerequisite(_)));
    }

    #[test]
    fn test_create_reports_number_collision() {
        let mut fx = fixture();
        // One order on file; renumber it to the next computed number
        let mut ledger = Ledger::new();
        ledger
            .set_field(
                &mut fx.session,
                fx.order_id,
                OrderField::OrderNumber("PO00002".into()),
            )
            .unwrap();

        let err = ledger.create_on(&mut fx.session, "PO", today()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::OrderNumberInUse { ref order_number } if order_number == "PO00002"
        ));
        assert_eq!(fx.session.order_count(), 1);
    }

    #[test]
    fn test_set_field_reports_changes_once() {
        let mut fx = fixture();
        let mut ledger = Ledger::new();

        let changed = ledger
            .set_field(&mut fx.session, fx.order_id, OrderField::Notes("Urgent".into()))
            .unwrap();
        assert!(changed);

        let changed = ledger
            .set_field(&mut fx.session, fx.order_id, OrderField::Notes("Urgent".into()))
            .unwrap();
        assert!(!changed);

        assert_eq!(
            ledger.take_events(),
            vec![LedgerEvent::FieldChanged {
                order: fx.order_id,
                field: FieldName::Notes
            }]
        );
    }

    #[test]
    fn test_set_field_resolves_natural_keys() {
        let mut fx = fixture();
        let mut ledger = Ledger::new();

        ledger
            .set_field(&mut fx.session, fx.order_id, OrderField::Supplier("BoltCo".into()))
            .unwrap();
        assert_eq!(fx.session.order(fx.order_id).unwrap().supplier_id, fx.boltco);

        let err = ledger
            .set_field(&mut fx.session, fx.order_id, OrderField::Project("NOPE".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_set_field_validates_order_number() {
        let mut fx = fixture();
        let mut ledger = Ledger::new();

        let err = ledger
            .set_field(
                &mut fx.session,
                fx.order_id,
                OrderField::OrderNumber("PO000001".repeat(2)),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooLong { .. })
        ));
        assert!(ledger.take_events().is_empty());
    }

    #[test]
    fn test_tax_rate_sources() {
        let mut fx = fixture();
        fx.session
            .add_config(new_config(20), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .unwrap();

        let latest = Ledger::tax_rate_for(&fx.session, fx.order_id, TaxRateSource::Latest).unwrap();
        let own =
            Ledger::tax_rate_for(&fx.session, fx.order_id, TaxRateSource::OrderSnapshot).unwrap();
        assert_eq!(latest, dec!(0.20));
        assert_eq!(own, dec!(0.15));
    }

    #[test]
    fn test_delete_removes_order() {
        let mut fx = fixture();
        let mut ledger = Ledger::new();

        ledger.delete(&mut fx.session, fx.order_id).unwrap();
        assert!(Ledger::get(&fx.session, fx.order_id).is_err());
        assert_eq!(Ledger::orders(&fx.session).count(), 0);
    }
}
