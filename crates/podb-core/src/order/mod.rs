//! # Order Editing
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  aggregate  ActiveOrder      one order open for editing                 │
//! │  buffer     LineItemBuffer   editable rows + sentinel                   │
//! │  ledger     Ledger           order records, numbering, field writes     │
//! │  events     *Event           what changed, drained by ActiveOrder       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod buffer;
pub mod events;
pub mod ledger;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::ActiveOrder;
pub use buffer::{
    BufferedLine, EditOutcome, LineItemBuffer, ProductKey, RowView, ADD_NEW_PRODUCT_LABEL,
};
pub use events::{BufferEvent, FieldName, LedgerEvent, LineColumn, OrderEvent, OrderTotals};
pub use ledger::{Ledger, OrderField};
