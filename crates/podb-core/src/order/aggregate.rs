//! # Active Order
//!
//! The editing session for one purchase order: its ledger record, its
//! line-item buffer and the totals that tie them together.
//!
//! ## Edit Cascade
//! ```text
//! ┌──────────────┐  edit   ┌────────────────┐
//! │   caller     │────────►│ LineItemBuffer │──┐ BufferEvent
//! │  (form/grid) │         └────────────────┘  │
//! │              │  edit   ┌────────────────┐  │
//! │              │────────►│     Ledger     │──┤ LedgerEvent
//! └──────▲───────┘         └────────────────┘  │
//!        │                                      ▼
//!        │                 ┌──────────────────────────────────┐
//!        │  OrderEvent     │ ActiveOrder::process_events       │
//!        └─────────────────│  dirty = true                     │
//!                          │  recompute totals (not for total  │
//!                          │  or config writes)                │
//!                          └──────────────────────────────────┘
//! ```
//!
//! ## Save / Discard
//! ```text
//! pre_commit()     drop sentinel, flush buffer to persisted lines,
//!                  restore sentinel
//! (store commits the session)
//! post_commit()    dirty = false
//!
//! (store or caller rolls the session back)
//! post_rollback()  dirty = false; the caller rebuilds the ActiveOrder
//! ```
//!
//! The session is passed to every call rather than held, so the same
//! session can serve catalog screens while an order is open.

use std::fmt;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{AppConfig, TaxRateSource};
use crate::conversion::{decimal_to_monetary, CurrencyScale};
use crate::error::{ConversionError, CoreError, CoreResult};
use crate::order::buffer::{EditOutcome, LineItemBuffer, ProductKey};
use crate::order::events::{BufferEvent, LedgerEvent, LineColumn, OrderEvent, OrderTotals};
use crate::order::ledger::{Ledger, OrderField};
use crate::session::Session;
use crate::types::{OrderId, OrderStatus, PaymentTerms, PurchaseOrder};

type Observer = Box<dyn FnMut(&OrderEvent)>;

/// One purchase order open for editing.
pub struct ActiveOrder {
    order_id: OrderId,
    ledger: Ledger,
    buffer: LineItemBuffer,
    scale: CurrencyScale,
    tax_rate_source: TaxRateSource,
    totals: OrderTotals,
    dirty: bool,
    observers: Vec<Observer>,
}

impl fmt::Debug for ActiveOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveOrder")
            .field("order_id", &self.order_id)
            .field("rows", &self.buffer.len())
            .field("totals", &self.totals)
            .field("dirty", &self.dirty)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ActiveOrder {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates a new order and opens it.
    ///
    /// The new order is flushed so it has an id. It starts dirty.
    ///
    /// ## Errors
    /// - `Prerequisite` if there is no supplier, project or config
    /// - `OrderNumberInUse` if the computed number is taken
    pub fn new(session: &mut Session, config: &AppConfig) -> CoreResult<Self> {
        let mut ledger = Ledger::new();
        let key = ledger.create(session, config.number_prefix())?;
        session.flush();
        let order_id = session.resolve_pending(key)?;

        info!(order_id = %order_id, "Opened new purchase order");
        Self::build(session, config, ledger, order_id, true)
    }

    /// Opens an existing order.
    ///
    /// Totals are recomputed straight away. If they come out different from
    /// the stored ones (a new tax rate, say) the order opens dirty.
    pub fn open(session: &mut Session, config: &AppConfig, order_id: OrderId) -> CoreResult<Self> {
        Ledger::get(session, order_id)?;
        session.flush();

        debug!(order_id = %order_id, "Opened purchase order");
        Self::build(session, config, Ledger::new(), order_id, false)
    }

    fn build(
        session: &mut Session,
        config: &AppConfig,
        ledger: Ledger,
        order_id: OrderId,
        dirty: bool,
    ) -> CoreResult<Self> {
        let scale = config.currency_scale();
        let buffer = LineItemBuffer::new(session, order_id, scale)?;
        let stored = Ledger::get(session, order_id)?;
        let totals = OrderTotals {
            excluding_tax: stored.total_excluding_tax,
            tax: stored.total_tax,
            including_tax: stored.total_including_tax,
        };

        let mut order = ActiveOrder {
            order_id,
            ledger,
            buffer,
            scale,
            tax_rate_source: config.tax_rate_source(),
            totals,
            dirty,
            observers: Vec::new(),
        };
        order.recompute_totals(session)?;
        Ok(order)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn order<'s>(&self, session: &'s Session) -> CoreResult<&'s PurchaseOrder> {
        Ledger::get(session, self.order_id)
    }

    pub fn buffer(&self) -> &LineItemBuffer {
        &self.buffer
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn currency_scale(&self) -> CurrencyScale {
        self.scale
    }

    pub fn tax_rate_source(&self) -> TaxRateSource {
        self.tax_rate_source
    }

    /// True if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_line_items(&self) -> bool {
        self.buffer.has_line_items()
    }

    /// Registers a callback for every [`OrderEvent`].
    pub fn subscribe(&mut self, observer: impl FnMut(&OrderEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: OrderEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Recomputes the three totals and writes them to the order.
    ///
    /// ```text
    /// excluding = sum of valid line prices
    /// tax       = excluding * tax rate
    /// including = excluding + tax
    /// ```
    /// Each is rounded half-to-even on its own when stored. With the
    /// `latest` tax source the order is re-pointed at the latest config
    /// whenever the totals change.
    pub fn recompute_totals(&mut self, session: &mut Session) -> CoreResult<()> {
        let config = Ledger::tax_config(session, self.order_id, self.tax_rate_source)?;
        let config_id = config.id;
        let rate = Ledger::tax_rate_for(session, self.order_id, self.tax_rate_source)?;

        let excluding: Decimal = self.buffer.total_excluding_tax()?;
        let tax = excluding
            .checked_mul(rate)
            .ok_or_else(|| ConversionError::Overflow(format!("{excluding} x {rate}")))?;
        let including = excluding
            .checked_add(tax)
            .ok_or_else(|| ConversionError::Overflow(format!("{excluding} + {tax}")))?;

        let totals = OrderTotals {
            excluding_tax: decimal_to_monetary(excluding, self.scale)?,
            tax: decimal_to_monetary(tax, self.scale)?,
            including_tax: decimal_to_monetary(including, self.scale)?,
        };

        let id = self.order_id;
        let mut changed = false;
        changed |= self.ledger.set_field(
            session,
            id,
            OrderField::TotalExcludingTax(totals.excluding_tax),
        )?;
        changed |= self
            .ledger
            .set_field(session, id, OrderField::TotalTax(totals.tax))?;
        changed |= self.ledger.set_field(
            session,
            id,
            OrderField::TotalIncludingTax(totals.including_tax),
        )?;
        if changed && self.tax_rate_source == TaxRateSource::Latest {
            self.ledger
                .set_field(session, id, OrderField::Config(config_id))?;
        }

        debug!(
            order_id = %id,
            excluding = totals.excluding_tax,
            tax = totals.tax,
            including = totals.including_tax,
            "Recomputed totals"
        );
        self.totals = totals;

        // Derived writes mark the order dirty and nothing else
        for event in self.ledger.take_events() {
            let LedgerEvent::FieldChanged { field, .. } = event;
            self.dirty = true;
            self.emit(OrderEvent::FieldChanged(field));
        }
        self.emit(OrderEvent::TotalsChanged(totals));
        Ok(())
    }

    /// Handles queued buffer and ledger events until none are left.
    fn process_events(&mut self, session: &mut Session) -> CoreResult<()> {
        loop {
            let ledger_events = self.ledger.take_events();
            let buffer_events = self.buffer.take_events();
            if ledger_events.is_empty() && buffer_events.is_empty() {
                return Ok(());
            }

            let mut recompute = false;
            for LedgerEvent::FieldChanged { field, .. } in ledger_events {
                self.dirty = true;
                recompute |= !field.is_derived();
                self.emit(OrderEvent::FieldChanged(field));
            }
            for event in buffer_events {
                if event.is_data_change() {
                    self.dirty = true;
                    recompute = true;
                    self.emit(OrderEvent::LinesChanged(event));
                } else {
                    self.emit(OrderEvent::AddNewProductRequested);
                }
            }

            if recompute {
                self.recompute_totals(session)?;
            }
        }
    }

    // =========================================================================
    // Line Item Edits
    // =========================================================================

    pub fn select_product(
        &mut self,
        session: &mut Session,
        row: usize,
        key: ProductKey<'_>,
    ) -> CoreResult<EditOutcome> {
        let outcome = self.buffer.select_product(session, row, key);
        self.process_events(session)?;
        Ok(outcome)
    }

    pub fn edit_price(
        &mut self,
        session: &mut Session,
        row: usize,
        value: f64,
    ) -> CoreResult<EditOutcome> {
        let outcome = self.buffer.edit_price(row, value);
        self.process_events(session)?;
        Ok(outcome)
    }

    pub fn edit_discount(
        &mut self,
        session: &mut Session,
        row: usize,
        value: Decimal,
    ) -> CoreResult<EditOutcome> {
        let outcome = self.buffer.edit_discount(row, value);
        self.process_events(session)?;
        Ok(outcome)
    }

    pub fn edit_quantity(
        &mut self,
        session: &mut Session,
        row: usize,
        value: i64,
    ) -> CoreResult<EditOutcome> {
        let outcome = self.buffer.edit_quantity(row, value);
        self.process_events(session)?;
        Ok(outcome)
    }

    pub fn set_cell_text(
        &mut self,
        session: &mut Session,
        row: usize,
        column: LineColumn,
        text: &str,
    ) -> CoreResult<EditOutcome> {
        let outcome = self.buffer.set_cell_text(session, row, column, text);
        self.process_events(session)?;
        Ok(outcome)
    }

    pub fn remove_row(&mut self, session: &mut Session, row: usize) -> CoreResult<()> {
        self.buffer.remove_row(row)?;
        self.process_events(session)
    }

    /// Deletes every line, persisted ones included, leaving the sentinel.
    pub fn remove_all_line_items(&mut self, session: &mut Session) -> CoreResult<()> {
        self.buffer.remove_all_rows(session)?;
        self.buffer.restore_empty_row();
        self.process_events(session)
    }

    // =========================================================================
    // Order Field Edits
    // =========================================================================

    /// Writes one order field. Supplier changes go through
    /// [`set_supplier`](Self::set_supplier).
    pub fn set_field(&mut self, session: &mut Session, field: OrderField) -> CoreResult<bool> {
        if let OrderField::Supplier(company_name) = &field {
            return self.set_supplier(session, company_name);
        }
        let changed = self.ledger.set_field(session, self.order_id, field)?;
        self.process_events(session)?;
        Ok(changed)
    }

    /// Switches the order to another supplier.
    ///
    /// Lines belong to the old supplier's catalog, so they are all deleted
    /// (persisted ones too, even when the buffer no longer shows them) and
    /// the buffer starts over with the sentinel.
    /// Picking the current supplier again changes nothing.
    ///
    /// ## User Workflow
    /// ```text
    /// Acme order with 2 lines
    ///      │  set_supplier("BoltCo")
    ///      ▼
    /// lines deleted, supplier = BoltCo, buffer = [sentinel]
    ///      │
    ///      ▼
    /// totals = 0, order dirty
    /// ```
    pub fn set_supplier(&mut self, session: &mut Session, company_name: &str) -> CoreResult<bool> {
        let current = Ledger::get(session, self.order_id)?.supplier_id;
        let target = session
            .supplier_by_name(company_name)
            .ok_or_else(|| CoreError::not_found("Supplier", company_name))?
            .id;
        if current == target {
            return Ok(false);
        }

        info!(order_id = %self.order_id, supplier = company_name, "Changing supplier");
        self.buffer.remove_all_rows(session)?;
        self.ledger.set_field(
            session,
            self.order_id,
            OrderField::Supplier(company_name.to_string()),
        )?;
        self.buffer.reset(session)?;
        self.process_events(session)?;
        Ok(true)
    }

    pub fn set_project(&mut self, session: &mut Session, code: &str) -> CoreResult<bool> {
        self.set_field(session, OrderField::Project(code.to_string()))
    }

    pub fn set_order_status(
        &mut self,
        session: &mut Session,
        status: OrderStatus,
    ) -> CoreResult<bool> {
        self.set_field(session, OrderField::OrderStatus(status))
    }

    pub fn set_payment_terms(
        &mut self,
        session: &mut Session,
        terms: PaymentTerms,
    ) -> CoreResult<bool> {
        self.set_field(session, OrderField::PaymentTerms(terms))
    }

    pub fn set_notes(&mut self, session: &mut Session, notes: &str) -> CoreResult<bool> {
        self.set_field(session, OrderField::Notes(notes.to_string()))
    }

    pub fn set_order_date(
        &mut self,
        session: &mut Session,
        date: chrono::NaiveDate,
    ) -> CoreResult<bool> {
        self.set_field(session, OrderField::OrderDate(date))
    }

    pub fn set_delivery_date(
        &mut self,
        session: &mut Session,
        date: chrono::NaiveDate,
    ) -> CoreResult<bool> {
        self.set_field(session, OrderField::DeliveryDate(date))
    }

    pub fn set_delivery_address(&mut self, session: &mut Session, address: &str) -> CoreResult<bool> {
        self.set_field(session, OrderField::DeliveryAddress(address.to_string()))
    }

    pub fn set_delivery_gps(
        &mut self,
        session: &mut Session,
        gps: Option<&str>,
    ) -> CoreResult<bool> {
        self.set_field(session, OrderField::DeliveryGps(gps.map(str::to_string)))
    }

    // =========================================================================
    // Save / Discard
    // =========================================================================

    /// Moves the buffered lines into the session ahead of a commit.
    ///
    /// The sentinel is dropped for the flush and put back afterwards, so
    /// the buffer is still editable if the commit fails.
    pub fn pre_commit(&mut self, session: &mut Session) -> CoreResult<()> {
        self.buffer.remove_trailing_empty_row();
        let flushed = self.buffer.flush_to_persisted(session);
        self.buffer.restore_empty_row();

        // Row churn from the save is not an edit
        self.buffer.take_events();
        flushed
    }

    /// The session was committed.
    pub fn post_commit(&mut self) {
        info!(order_id = %self.order_id, "Purchase order saved");
        self.dirty = false;
    }

    /// The session was rolled back.
    ///
    /// A new order may no longer exist, so the caller rebuilds the
    /// `ActiveOrder` (or drops it) rather than keep editing this one.
    pub fn post_rollback(&mut self) {
        info!(order_id = %self.order_id, "Purchase order changes discarded");
        self.dirty = false;
    }

    /// Reloads the buffer from the persisted lines and recomputes.
    ///
    /// Used after a rollback when the order still exists.
    pub fn reload(&mut self, session: &mut Session) -> CoreResult<()> {
        Ledger::get(session, self.order_id)?;
        self.buffer.reset(session)?;
        self.buffer.take_events();
        self.emit(OrderEvent::LinesChanged(BufferEvent::Reset));
        self.recompute_totals(session)?;
        self.dirty = false;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::testing::{catalog, fixture, new_config, Fixture};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn open(session: &mut Session, order_id: OrderId) -> ActiveOrder {
        ActiveOrder::open(session, &AppConfig::default(), order_id).unwrap()
    }

    #[test]
    fn test_new_order_starts_dirty_with_sentinel() {
        let (mut session, acme, ..) = catalog();
        let order = ActiveOrder::new(&mut session, &AppConfig::default()).unwrap();

        assert!(order.is_dirty());
        assert_eq!(order.buffer().len(), 1);
        assert!(!order.has_line_items());
        assert_eq!(order.totals(), OrderTotals::default());

        let record = order.order(&session).unwrap();
        assert_eq!(record.order_number, "PO00001");
        assert_eq!(record.supplier_id, acme);
        assert_eq!(record.id, Some(order.order_id()));
    }

    #[test]
    fn test_new_order_fails_without_catalog() {
        let mut session = Session::new();
        let err = ActiveOrder::new(&mut session, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::Prerequisite(_)));
        assert_eq!(session.order_count(), 0);
    }

    #[test]
    fn test_open_existing_order_is_clean() {
        let mut fx = fixture();
        let order = open(&mut fx.session, fx.order_id);
        assert!(!order.is_dirty());
    }

    #[test]
    fn test_selecting_products_recomputes_totals() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);

        // 10.00 less 10% x 3 = 27.00
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();
        order.edit_quantity(&mut fx.session, 0, 3).unwrap();
        // 2.50 x 4 = 10.00
        order
            .select_product(&mut fx.session, 1, ProductKey::Description("Nut 10mm"))
            .unwrap();
        order.edit_quantity(&mut fx.session, 1, 4).unwrap();

        assert!(order.is_dirty());
        assert_eq!(
            order.totals(),
            OrderTotals {
                excluding_tax: 3700,
                tax: 555,
                including_tax: 4255,
            }
        );

        let record = order.order(&fx.session).unwrap();
        assert_eq!(record.total_excluding_tax, 3700);
        assert_eq!(record.total_tax, 555);
        assert_eq!(record.total_including_tax, 4255);
    }

    #[test]
    fn test_each_total_rounds_half_even() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);

        // 0.10 at 15% = 0.015 tax
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("N-10"))
            .unwrap();
        order.edit_price(&mut fx.session, 0, 0.10).unwrap();

        let totals = order.totals();
        assert_eq!(totals.excluding_tax, 10);
        assert_eq!(totals.tax, 2);
        assert_eq!(totals.including_tax, 12);
    }

    #[test]
    fn test_rejected_edit_leaves_order_clean() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);

        let outcome = order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("X-1"))
            .unwrap();
        assert!(matches!(outcome, EditOutcome::Rejected(_)));
        assert!(!order.is_dirty());
    }

    #[test]
    fn test_events_reach_subscribers() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        order.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("N-10"))
            .unwrap();
        order
            .select_product(
                &mut fx.session,
                1,
                ProductKey::PartNumber(crate::order::ADD_NEW_PRODUCT_LABEL),
            )
            .unwrap();

        let seen = seen.borrow();
        assert!(seen
            .iter()
            .any(|e| matches!(e, OrderEvent::TotalsChanged(t) if t.excluding_tax == 250)));
        assert_eq!(seen.last(), Some(&OrderEvent::AddNewProductRequested));
    }

    #[test]
    fn test_add_new_product_does_not_dirty() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);

        let outcome = order
            .select_product(
                &mut fx.session,
                0,
                ProductKey::Description(crate::order::ADD_NEW_PRODUCT_LABEL),
            )
            .unwrap();
        assert_eq!(outcome, EditOutcome::AddNewProductRequested);
        assert!(!order.is_dirty());
    }

    #[test]
    fn test_set_supplier_clears_lines() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();
        order.pre_commit(&mut fx.session).unwrap();
        fx.session.commit();
        order.post_commit();

        assert!(order.set_supplier(&mut fx.session, "BoltCo").unwrap());

        assert_eq!(order.order(&fx.session).unwrap().supplier_id, fx.boltco);
        assert_eq!(order.buffer().len(), 1);
        assert!(fx.session.order_lines(fx.order_id).is_empty());
        assert_eq!(order.totals(), OrderTotals::default());
        assert!(order.is_dirty());

        // New catalog applies
        let outcome = order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("X-1"))
            .unwrap();
        assert!(outcome.is_applied());
    }

    #[test]
    fn test_set_same_supplier_is_noop() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();

        assert!(!order.set_supplier(&mut fx.session, "Acme").unwrap());
        assert_eq!(order.buffer().len(), 2);
    }

    #[test]
    fn test_set_unknown_supplier_keeps_lines() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();

        assert!(order.set_supplier(&mut fx.session, "Nobody").is_err());
        assert_eq!(order.buffer().len(), 2);
    }

    #[test]
    fn test_field_edit_marks_dirty() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);

        assert!(order
            .set_order_status(&mut fx.session, OrderStatus::Placed)
            .unwrap());
        assert!(order.is_dirty());
        assert_eq!(
            order.order(&fx.session).unwrap().order_status,
            OrderStatus::Placed
        );
    }

    #[test]
    fn test_pre_commit_persists_valid_lines_only() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();
        order
            .select_product(&mut fx.session, 1, ProductKey::PartNumber("N-10"))
            .unwrap();

        order.pre_commit(&mut fx.session).unwrap();
        fx.session.commit();
        order.post_commit();

        let lines = fx.session.order_lines(fx.order_id);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, Some(fx.bolt));
        assert_eq!(lines[1].product_id, Some(fx.nut));
        assert_eq!(order.buffer().len(), 3);
        assert!(!order.is_dirty());
    }

    #[test]
    fn test_rollback_and_reload() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();
        order.pre_commit(&mut fx.session).unwrap();

        fx.session.rollback();
        order.post_rollback();
        order.reload(&mut fx.session).unwrap();

        assert!(!order.is_dirty());
        assert_eq!(order.buffer().len(), 1);
        assert_eq!(order.totals(), OrderTotals::default());
    }

    #[test]
    fn test_open_after_tax_change_is_dirty() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("N-10"))
            .unwrap();
        order.pre_commit(&mut fx.session).unwrap();
        fx.session.commit();
        drop(order);

        let newer = fx
            .session
            .add_config(new_config(20), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        fx.session.commit();

        let order = open(&mut fx.session, fx.order_id);
        assert!(order.is_dirty());
        assert_eq!(order.totals().tax, 50);
        assert_eq!(order.order(&fx.session).unwrap().config_id, newer);
    }

    #[test]
    fn test_order_snapshot_keeps_old_rate() {
        let mut fx = fixture();
        fx.session
            .add_config(new_config(20), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .unwrap();

        let mut config = AppConfig::default();
        config.totals.tax_rate_source = TaxRateSource::OrderSnapshot;
        let mut order = ActiveOrder::open(&mut fx.session, &config, fx.order_id).unwrap();
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("N-10"))
            .unwrap();

        assert_eq!(order.totals().tax, 38);
        assert_eq!(order.order(&fx.session).unwrap().config_id, fx.config);
    }

    #[test]
    fn test_remove_all_line_items() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();

        order.remove_all_line_items(&mut fx.session).unwrap();
        assert_eq!(order.buffer().len(), 1);
        assert_eq!(order.totals().including_tax, 0);
    }

    #[test]
    fn test_discount_edit_recomputes() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();

        order.edit_discount(&mut fx.session, 0, dec!(0.50)).unwrap();
        assert_eq!(order.totals().excluding_tax, 500);

        let outcome = order.edit_discount(&mut fx.session, 0, dec!(1.5)).unwrap();
        assert!(matches!(outcome, EditOutcome::Rejected(_)));
        assert_eq!(order.totals().excluding_tax, 500);
    }

    #[test]
    fn test_new_orders_number_sequentially() {
        let (mut session, ..) = catalog();
        let config = AppConfig::default();

        ActiveOrder::new(&mut session, &config).unwrap();
        let second = ActiveOrder::new(&mut session, &config).unwrap();
        assert_eq!(second.order(&session).unwrap().order_number, "PO00002");
    }

    fn saved_with(fx: &mut Fixture, parts: &[&str]) -> ActiveOrder {
        let mut order = open(&mut fx.session, fx.order_id);
        for (row, part) in parts.iter().enumerate() {
            order
                .select_product(&mut fx.session, row, ProductKey::PartNumber(part))
                .unwrap();
        }
        order.pre_commit(&mut fx.session).unwrap();
        fx.session.commit();
        order.post_commit();
        order
    }

    #[test]
    fn test_set_supplier_after_removing_every_row_drops_saved_lines() {
        let mut fx = fixture();
        let mut order = saved_with(&mut fx, &["B-10"]);

        order.remove_row(&mut fx.session, 0).unwrap();
        assert_eq!(order.buffer().len(), 1);
        // Still on file until the next save
        assert_eq!(fx.session.order_lines(fx.order_id).len(), 1);

        assert!(order.set_supplier(&mut fx.session, "BoltCo").unwrap());

        assert_eq!(order.buffer().len(), 1);
        assert!(!order.buffer().rows()[0].valid);
        assert!(fx.session.order_lines(fx.order_id).is_empty());
        assert_eq!(order.totals(), OrderTotals::default());

        order.pre_commit(&mut fx.session).unwrap();
        assert!(fx.session.order_lines(fx.order_id).is_empty());
    }

    #[test]
    fn test_remove_row_marks_dirty_and_recomputes() {
        let mut fx = fixture();
        let mut order = saved_with(&mut fx, &["B-10", "N-10"]);
        assert!(!order.is_dirty());
        assert_eq!(order.totals().excluding_tax, 1150);

        order.remove_row(&mut fx.session, 0).unwrap();

        assert!(order.is_dirty());
        assert_eq!(order.buffer().len(), 2);
        // 2.50 at 15%: 0.375 and 2.875 round half-even
        assert_eq!(
            order.totals(),
            OrderTotals {
                excluding_tax: 250,
                tax: 38,
                including_tax: 288,
            }
        );
        assert_eq!(order.order(&fx.session).unwrap().total_excluding_tax, 250);
    }

    #[test]
    fn test_edit_price_marks_clean_order_dirty() {
        let mut fx = fixture();
        let mut order = saved_with(&mut fx, &["B-10"]);
        assert!(!order.is_dirty());

        // 20.00 less 10%
        let outcome = order.edit_price(&mut fx.session, 0, 20.0).unwrap();

        assert!(outcome.is_applied());
        assert!(order.is_dirty());
        assert_eq!(
            order.totals(),
            OrderTotals {
                excluding_tax: 1800,
                tax: 270,
                including_tax: 2070,
            }
        );
    }

    #[test]
    fn test_quantity_too_large_for_totals_is_rejected() {
        let mut fx = fixture();
        let mut order = open(&mut fx.session, fx.order_id);
        order
            .select_product(&mut fx.session, 0, ProductKey::PartNumber("B-10"))
            .unwrap();
        order.edit_price(&mut fx.session, 0, 1.0e15).unwrap();
        let before = order.totals();

        let outcome = order
            .edit_quantity(&mut fx.session, 0, i64::MAX)
            .unwrap();

        assert!(matches!(
            outcome,
            EditOutcome::Rejected(crate::error::ValidationError::TooLarge { .. })
        ));
        assert_eq!(order.buffer().rows()[0].line.quantity, 1);
        assert_eq!(order.totals(), before);
    }
}
