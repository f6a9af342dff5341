//! # Line-Item Buffer
//!
//! Editable rows of one purchase order, held apart from the persisted
//! lines until the order is saved.
//!
//! ## Row Layout
//! ```text
//! ┌─────┬─────────────┬──────────────┬────────┬──────────┬─────┬───────────┐
//! │ row │ Part number │ Description  │ Price  │ Discount │ Qty │ Line      │
//! ├─────┼─────────────┼──────────────┼────────┼──────────┼─────┼───────────┤
//! │  0  │ B-10        │ Bolt 10mm    │ 10.00  │ 10%      │ 3   │ 27.00     │ valid
//! │  1  │ N-10        │ Nut 10mm     │  2.50  │  0%      │ 4   │ 10.00     │ valid
//! │  2  │             │              │  0.00  │  0%      │ 1   │  0.00     │ sentinel
//! └─────┴─────────────┴──────────────┴────────┴──────────┴─────┴───────────┘
//! ```
//!
//! ## Invariants
//! - While editing there is exactly one sentinel row and it is last.
//! - Only the sentinel may be invalid (no product picked).
//! - A product appears on at most one row.
//! - Price and discount are copied from the catalog when the product is
//!   picked. Later catalog changes do not reach existing rows.
//!
//! The sentinel is dropped only around a save: the aggregate calls
//! [`remove_trailing_empty_row`](LineItemBuffer::remove_trailing_empty_row),
//! flushes, then [`restore_empty_row`](LineItemBuffer::restore_empty_row).

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::conversion::{
    decimal_to_monetary, decimal_to_percentage, float_to_monetary, monetary_to_decimal,
    parse_decimal, percentage_to_decimal, CurrencyScale, MAX_PERCENTAGE,
};
use crate::error::{ConversionError, CoreError, CoreResult, ValidationError};
use crate::order::events::{BufferEvent, LineColumn};
use crate::session::Session;
use crate::types::{OrderId, OrderLine, Product, SupplierId};
use crate::validation::validate_quantity;

/// Choice offered after the catalog entries in the product pickers.
pub const ADD_NEW_PRODUCT_LABEL: &str = "Add new...";

// =============================================================================
// Supporting Types
// =============================================================================

/// How a product is picked: by part number or by description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKey<'a> {
    PartNumber(&'a str),
    Description(&'a str),
}

impl<'a> ProductKey<'a> {
    pub fn value(&self) -> &'a str {
        match self {
            ProductKey::PartNumber(v) | ProductKey::Description(v) => v,
        }
    }

    fn field(&self) -> &'static str {
        match self {
            ProductKey::PartNumber(_) => "part number",
            ProductKey::Description(_) => "description",
        }
    }

    fn column(&self) -> LineColumn {
        match self {
            ProductKey::PartNumber(_) => LineColumn::PartNumber,
            ProductKey::Description(_) => LineColumn::Description,
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            ProductKey::PartNumber(v) => product.part_number == *v,
            ProductKey::Description(v) => product.description == *v,
        }
    }
}

/// A row in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedLine {
    pub line: OrderLine,

    /// False until a product is picked.
    pub valid: bool,
}

impl BufferedLine {
    fn sentinel(order_id: OrderId) -> Self {
        BufferedLine {
            line: OrderLine::empty(order_id),
            valid: false,
        }
    }
}

/// Result of a cell edit.
///
/// Rejections are the recoverable class: the row keeps its previous value
/// and the caller shows the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// The new value equals the old one. Nothing was written.
    Unchanged,
    Rejected(ValidationError),
    AddNewProductRequested,
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

/// Display values for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub part_number: String,
    pub description: String,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub quantity: i64,
    pub line_price: Decimal,
    pub valid: bool,
}

// =============================================================================
// Line-Item Buffer
// =============================================================================

/// Editable line items of one order.
#[derive(Debug, Clone)]
pub struct LineItemBuffer {
    order_id: OrderId,
    supplier_id: SupplierId,
    scale: CurrencyScale,
    rows: Vec<BufferedLine>,
    events: Vec<BufferEvent>,
}

impl LineItemBuffer {
    /// Loads the persisted lines of `order_id` and appends the sentinel.
    pub fn new(session: &Session, order_id: OrderId, scale: CurrencyScale) -> CoreResult<Self> {
        let mut buffer = LineItemBuffer {
            order_id,
            supplier_id: SupplierId(0),
            scale,
            rows: Vec::new(),
            events: Vec::new(),
        };
        buffer.load(session)?;
        Ok(buffer)
    }

    fn load(&mut self, session: &Session) -> CoreResult<()> {
        let order = session
            .order(self.order_id)
            .ok_or_else(|| CoreError::not_found("Purchase order", self.order_id))?;

        self.supplier_id = order.supplier_id;
        self.rows = session
            .order_lines(self.order_id)
            .iter()
            .cloned()
            .map(|line| BufferedLine { line, valid: true })
            .collect();
        self.rows.push(BufferedLine::sentinel(self.order_id));
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Supplier whose catalog the rows are picked from.
    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn rows(&self) -> &[BufferedLine] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True if there is anything besides the sentinel.
    pub fn has_line_items(&self) -> bool {
        self.rows.len() > 1
    }

    pub fn valid_lines(&self) -> impl Iterator<Item = &OrderLine> {
        self.rows.iter().filter(|r| r.valid).map(|r| &r.line)
    }

    fn ends_with_sentinel(&self) -> bool {
        self.rows.last().is_some_and(|r| !r.valid)
    }

    /// Display values for `row`.
    pub fn row_view(&self, session: &Session, row: usize) -> CoreResult<RowView> {
        let buffered = self.rows.get(row).ok_or(CoreError::RowOutOfRange {
            row,
            len: self.rows.len(),
        })?;
        let line = &buffered.line;
        let product = line.product_id.and_then(|id| session.product(id));

        Ok(RowView {
            part_number: product.map(|p| p.part_number.clone()).unwrap_or_default(),
            description: product.map(|p| p.description.clone()).unwrap_or_default(),
            unit_price: monetary_to_decimal(line.unit_price, self.scale),
            discount: percentage_to_decimal(line.discount)?,
            quantity: line.quantity,
            line_price: self.line_price(line)?,
            valid: buffered.valid,
        })
    }

    /// Choices for the part number or description picker.
    ///
    /// Active catalog entries in order, then [`ADD_NEW_PRODUCT_LABEL`].
    pub fn product_choices(&self, session: &Session, column: LineColumn) -> Vec<String> {
        let catalog = session.products_for_supplier(self.supplier_id, false);
        let mut choices: Vec<String> = match column {
            LineColumn::PartNumber => catalog.iter().map(|p| p.part_number.clone()).collect(),
            LineColumn::Description => catalog.iter().map(|p| p.description.clone()).collect(),
            _ => return Vec::new(),
        };
        choices.sort();
        choices.push(ADD_NEW_PRODUCT_LABEL.to_string());
        choices
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// `(price - price * discount) * quantity`, unrounded.
    ///
    /// ## Example
    /// ```rust
    /// use podb_core::order::LineItemBuffer;
    /// use rust_decimal::Decimal;
    ///
    /// let total = LineItemBuffer::line_total(Decimal::new(1000, 2), Decimal::new(10, 2), 3)?;
    /// assert_eq!(total, Decimal::new(2700, 2));
    /// # Ok::<(), podb_core::ConversionError>(())
    /// ```
    ///
    /// ## Errors
    /// `Overflow` if the product does not fit a `Decimal`.
    pub fn line_total(
        unit_price: Decimal,
        discount: Decimal,
        quantity: i64,
    ) -> Result<Decimal, ConversionError> {
        let overflow = || ConversionError::Overflow(format!("{unit_price} x {quantity}"));
        let discounted = unit_price
            .checked_mul(discount)
            .and_then(|off| unit_price.checked_sub(off))
            .ok_or_else(overflow)?;
        discounted
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(overflow)
    }

    fn line_price(&self, line: &OrderLine) -> CoreResult<Decimal> {
        Ok(Self::line_total(
            monetary_to_decimal(line.unit_price, self.scale),
            percentage_to_decimal(line.discount)?,
            line.quantity,
        )?)
    }

    /// Sum of the line prices of the valid rows.
    pub fn total_excluding_tax(&self) -> CoreResult<Decimal> {
        self.valid_lines().try_fold(Decimal::ZERO, |sum, line| {
            let price = self.line_price(line)?;
            sum.checked_add(price)
                .ok_or_else(|| CoreError::from(ConversionError::Overflow(format!("{sum} + {price}"))))
        })
    }

    /// Checks that the order total stays storable with `candidate` in `row`.
    ///
    /// Tax rates are below 100%, so twice the total excluding tax bounds
    /// every stored total.
    fn check_total_with(
        &self,
        row: usize,
        candidate: &OrderLine,
        counted: bool,
    ) -> Result<(), ValidationError> {
        let too_large = || ValidationError::TooLarge {
            field: "order total".to_string(),
        };

        let mut total = Decimal::ZERO;
        for (i, buffered) in self.rows.iter().enumerate() {
            let (line, valid) = if i == row {
                (candidate, counted)
            } else {
                (&buffered.line, buffered.valid)
            };
            if !valid {
                continue;
            }
            let price = self.line_price(line).map_err(|_| too_large())?;
            total = total.checked_add(price).ok_or_else(too_large)?;
        }

        let bound = total.checked_mul(Decimal::TWO).ok_or_else(too_large)?;
        decimal_to_monetary(bound, self.scale).map_err(|_| too_large())?;
        Ok(())
    }

    // =========================================================================
    // Cell Edits
    // =========================================================================

    fn check_row(&self, row: usize) -> Result<(), ValidationError> {
        if row >= self.rows.len() {
            return Err(ValidationError::NoSuchRow {
                row,
                len: self.rows.len(),
            });
        }
        Ok(())
    }

    /// Picks a product for `row` by part number or description.
    ///
    /// ## Flow
    /// ```text
    /// "Add new..."                   → AddNewProductRequested (no write)
    /// same product as the row has    → Unchanged
    /// not in the active catalog      → Rejected(NotInCatalog)
    /// already on another row         → Rejected(Duplicate)
    /// otherwise                      → copy price + discount, row valid
    ///                                  (sentinel row: new sentinel appended)
    /// ```
    pub fn select_product(
        &mut self,
        session: &Session,
        row: usize,
        key: ProductKey<'_>,
    ) -> EditOutcome {
        if let Err(e) = self.check_row(row) {
            return EditOutcome::Rejected(e);
        }

        if key.value() == ADD_NEW_PRODUCT_LABEL {
            self.events.push(BufferEvent::AddNewProductRequested);
            return EditOutcome::AddNewProductRequested;
        }

        let current = self.rows[row].line.product_id.and_then(|id| session.product(id));
        if current.is_some_and(|p| key.matches(p)) {
            return EditOutcome::Unchanged;
        }

        let Some(product) = session
            .products_for_supplier(self.supplier_id, false)
            .into_iter()
            .find(|p| key.matches(p))
        else {
            debug!(value = key.value(), "Product not in supplier catalog");
            return EditOutcome::Rejected(ValidationError::NotInCatalog {
                field: key.field().to_string(),
                value: key.value().to_string(),
            });
        };

        let listed = self
            .rows
            .iter()
            .enumerate()
            .any(|(i, r)| i != row && r.line.product_id == Some(product.id));
        if listed {
            warn!(
                order_id = %self.order_id,
                value = key.value(),
                "Product is already listed on the purchase order"
            );
            return EditOutcome::Rejected(ValidationError::Duplicate {
                field: key.field().to_string(),
                value: key.value().to_string(),
            });
        }

        let mut candidate = self.rows[row].line.clone();
        candidate.product_id = Some(product.id);
        candidate.unit_price = product.current_price;
        candidate.discount = product.current_discount;
        if let Err(e) = self.check_total_with(row, &candidate, true) {
            warn!(order_id = %self.order_id, row, "Selection would overflow the order total");
            return EditOutcome::Rejected(e);
        }

        let line = &mut self.rows[row];
        line.line = candidate;
        line.valid = true;

        if row == self.rows.len() - 1 {
            self.push_sentinel();
        }
        self.events.push(BufferEvent::DataChanged {
            row,
            column: key.column(),
        });
        EditOutcome::Applied
    }

    /// Sets the unit price from a float typed by the user.
    pub fn edit_price(&mut self, row: usize, value: f64) -> EditOutcome {
        if let Err(e) = self.check_row(row) {
            return EditOutcome::Rejected(e);
        }
        match float_to_monetary(value, self.scale) {
            Ok(price) => self.apply_price(row, price),
            Err(e) => EditOutcome::Rejected(ValidationError::invalid_format("unit price", e)),
        }
    }

    fn apply_price(&mut self, row: usize, price: i64) -> EditOutcome {
        if self.rows[row].line.unit_price == price {
            return EditOutcome::Unchanged;
        }
        let candidate = OrderLine {
            unit_price: price,
            ..self.rows[row].line.clone()
        };
        if let Err(e) = self.check_total_with(row, &candidate, self.rows[row].valid) {
            return EditOutcome::Rejected(e);
        }
        self.rows[row].line.unit_price = price;
        self.events.push(BufferEvent::DataChanged {
            row,
            column: LineColumn::UnitPrice,
        });
        EditOutcome::Applied
    }

    /// Sets the discount from a decimal fraction (`0.15` for 15%).
    pub fn edit_discount(&mut self, row: usize, value: Decimal) -> EditOutcome {
        if let Err(e) = self.check_row(row) {
            return EditOutcome::Rejected(e);
        }
        let Ok(discount) = decimal_to_percentage(value) else {
            return EditOutcome::Rejected(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: MAX_PERCENTAGE,
            });
        };

        if self.rows[row].line.discount == discount {
            return EditOutcome::Unchanged;
        }
        let candidate = OrderLine {
            discount,
            ..self.rows[row].line.clone()
        };
        if let Err(e) = self.check_total_with(row, &candidate, self.rows[row].valid) {
            return EditOutcome::Rejected(e);
        }
        self.rows[row].line.discount = discount;
        self.events.push(BufferEvent::DataChanged {
            row,
            column: LineColumn::Discount,
        });
        EditOutcome::Applied
    }

    pub fn edit_quantity(&mut self, row: usize, value: i64) -> EditOutcome {
        if let Err(e) = self.check_row(row).and_then(|_| validate_quantity(value)) {
            return EditOutcome::Rejected(e);
        }

        if self.rows[row].line.quantity == value {
            return EditOutcome::Unchanged;
        }
        let candidate = OrderLine {
            quantity: value,
            ..self.rows[row].line.clone()
        };
        if let Err(e) = self.check_total_with(row, &candidate, self.rows[row].valid) {
            warn!(order_id = %self.order_id, row, quantity = value, "Quantity would overflow the order total");
            return EditOutcome::Rejected(e);
        }
        self.rows[row].line.quantity = value;
        self.events.push(BufferEvent::DataChanged {
            row,
            column: LineColumn::Quantity,
        });
        EditOutcome::Applied
    }

    /// Applies text typed into a cell.
    ///
    /// Prices accept thousands separators. Discounts are whole percentage
    /// points with an optional `%` (`"15"` and `"15%"` both mean 15%).
    pub fn set_cell_text(
        &mut self,
        session: &Session,
        row: usize,
        column: LineColumn,
        text: &str,
    ) -> EditOutcome {
        let text = text.trim();
        match column {
            LineColumn::PartNumber => self.select_product(session, row, ProductKey::PartNumber(text)),
            LineColumn::Description => {
                self.select_product(session, row, ProductKey::Description(text))
            }
            LineColumn::UnitPrice => {
                let parsed = parse_decimal("unit price", text).and_then(|value| {
                    decimal_to_monetary(value, self.scale)
                        .map_err(|e| ValidationError::invalid_format("unit price", e))
                });
                match parsed.and_then(|price| self.check_row(row).map(|_| price)) {
                    Ok(price) => self.apply_price(row, price),
                    Err(e) => EditOutcome::Rejected(e),
                }
            }
            LineColumn::Discount => {
                match parse_decimal("discount", text.trim_end_matches('%')) {
                    Ok(points) => self.edit_discount(row, points / Decimal::ONE_HUNDRED),
                    Err(e) => EditOutcome::Rejected(e),
                }
            }
            LineColumn::Quantity => match text.parse::<i64>() {
                Ok(quantity) => self.edit_quantity(row, quantity),
                Err(e) => EditOutcome::Rejected(ValidationError::invalid_format("quantity", e)),
            },
            LineColumn::LinePrice => EditOutcome::Rejected(ValidationError::ReadOnly {
                field: "line price".to_string(),
            }),
        }
    }

    // =========================================================================
    // Row Management
    // =========================================================================

    fn push_sentinel(&mut self) {
        self.rows.push(BufferedLine::sentinel(self.order_id));
        let last = self.rows.len() - 1;
        self.events.push(BufferEvent::RowsInserted { first: last, last });
    }

    /// Removes one row. Removing the sentinel leaves a fresh one behind.
    pub fn remove_row(&mut self, row: usize) -> CoreResult<()> {
        if row >= self.rows.len() {
            return Err(CoreError::RowOutOfRange {
                row,
                len: self.rows.len(),
            });
        }

        self.rows.remove(row);
        self.events.push(BufferEvent::RowsRemoved {
            first: row,
            last: row,
        });
        if !self.ends_with_sentinel() {
            self.push_sentinel();
        }
        Ok(())
    }

    /// Empties the buffer and the order's persisted lines.
    ///
    /// No sentinel is left; follow with [`reset`](Self::reset) or
    /// [`restore_empty_row`](Self::restore_empty_row).
    pub fn remove_all_rows(&mut self, session: &mut Session) -> CoreResult<()> {
        session.set_order_lines(self.order_id, Vec::new())?;

        let removed = self.rows.len();
        self.rows.clear();
        if removed > 0 {
            self.events.push(BufferEvent::RowsRemoved {
                first: 0,
                last: removed - 1,
            });
        }
        debug!(order_id = %self.order_id, removed, "Removed all line items");
        Ok(())
    }

    /// Appends the sentinel if it is missing.
    pub fn restore_empty_row(&mut self) {
        if !self.ends_with_sentinel() {
            self.push_sentinel();
        }
    }

    /// Drops the sentinel ahead of a save.
    pub fn remove_trailing_empty_row(&mut self) {
        if self.ends_with_sentinel() {
            self.rows.pop();
            let row = self.rows.len();
            self.events.push(BufferEvent::RowsRemoved {
                first: row,
                last: row,
            });
        }
    }

    /// Reloads rows from the persisted lines, discarding unsaved edits.
    ///
    /// Also picks up a changed supplier on the order.
    pub fn reset(&mut self, session: &Session) -> CoreResult<()> {
        self.load(session)?;
        self.events.push(BufferEvent::Reset);
        Ok(())
    }

    /// Writes the valid rows to the order's persisted lines.
    pub fn flush_to_persisted(&self, session: &mut Session) -> CoreResult<()> {
        let lines: Vec<OrderLine> = self.valid_lines().cloned().collect();
        debug!(order_id = %self.order_id, lines = lines.len(), "Flushing line items");
        session.set_order_lines(self.order_id, lines)
    }

    pub(crate) fn take_events(&mut self) -> Vec<BufferEvent> {
        std::mem::take(&mut self.events)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
