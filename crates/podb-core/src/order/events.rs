//! Change notifications raised by the buffer and the ledger.
//!
//! Components never call back into each other. They queue events and the
//! [`ActiveOrder`](super::ActiveOrder) drains the queues after every edit,
//! so the totals cascade always runs against the buffer as it stands after
//! the edit that caused it.

use serde::{Deserialize, Serialize};

use crate::types::OrderId;

/// Buffer columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineColumn {
    PartNumber,
    Description,
    UnitPrice,
    Discount,
    Quantity,
    LinePrice,
}

impl LineColumn {
    pub const ALL: [LineColumn; 6] = [
        LineColumn::PartNumber,
        LineColumn::Description,
        LineColumn::UnitPrice,
        LineColumn::Discount,
        LineColumn::Quantity,
        LineColumn::LinePrice,
    ];

    pub const fn header(&self) -> &'static str {
        match self {
            LineColumn::PartNumber => "Part number",
            LineColumn::Description => "Description",
            LineColumn::UnitPrice => "Unit price",
            LineColumn::Discount => "Discount",
            LineColumn::Quantity => "Qty",
            LineColumn::LinePrice => "Line price",
        }
    }
}

/// Purchase order fields the ledger reports changes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldName {
    OrderNumber,
    OrderDate,
    DeliveryDate,
    DeliveryAddress,
    DeliveryGps,
    PaymentTerms,
    OrderStatus,
    Notes,
    TotalExcludingTax,
    TotalTax,
    TotalIncludingTax,
    Project,
    Supplier,
    Config,
}

impl FieldName {
    /// Fields written by the totals recompute itself.
    ///
    /// A change to one of these marks the order dirty but never starts
    /// another recompute.
    pub const fn is_derived(&self) -> bool {
        matches!(
            self,
            FieldName::TotalExcludingTax
                | FieldName::TotalTax
                | FieldName::TotalIncludingTax
                | FieldName::Config
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferEvent {
    /// Rows `first..=last` were inserted.
    RowsInserted { first: usize, last: usize },

    /// Rows `first..=last` were removed.
    RowsRemoved { first: usize, last: usize },

    DataChanged { row: usize, column: LineColumn },

    /// Every row was reloaded from the persisted lines.
    Reset,

    /// The user picked the "Add new..." choice. Nothing was written.
    AddNewProductRequested,
}

impl BufferEvent {
    /// True for events that changed row data.
    pub const fn is_data_change(&self) -> bool {
        !matches!(self, BufferEvent::AddNewProductRequested)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    FieldChanged { order: OrderId, field: FieldName },
}

/// Totals as stored on the order, in scaled monetary integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub excluding_tax: i64,
    pub tax: i64,
    pub including_tax: i64,
}

/// What subscribers of an [`ActiveOrder`](super::ActiveOrder) are told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    FieldChanged(FieldName),
    LinesChanged(BufferEvent),
    TotalsChanged(OrderTotals),
    AddNewProductRequested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_fields() {
        assert!(FieldName::TotalTax.is_derived());
        assert!(FieldName::Config.is_derived());
        assert!(!FieldName::Supplier.is_derived());
        assert!(!FieldName::Notes.is_derived());
    }

    #[test]
    fn test_add_new_product_is_not_a_data_change() {
        assert!(!BufferEvent::AddNewProductRequested.is_data_change());
        assert!(BufferEvent::Reset.is_data_change());
    }
}
