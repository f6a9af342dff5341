//! # podb-core: Purchase Order Logic for PODB
//!
//! Purchase order editing with no I/O: the order aggregate, its line-item
//! buffer, the order ledger and the scaled integer conversions they share.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PODB Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Order form / line item grid (caller)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ podb-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌─────────┐  │   │
//! │  │   │   order    │  │  session   │  │ conversion │  │ config  │  │   │
//! │  │   │ ActiveOrder│  │ unit of    │  │ scaled ints│  │ AppConf │  │   │
//! │  │   │ Buffer     │  │ work arena │  │ ↔ Decimal  │  │         │  │   │
//! │  │   │ Ledger     │  │            │  │            │  │         │  │   │
//! │  │   └────────────┘  └────────────┘  └────────────┘  └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO FILE SYSTEM • NO NETWORK                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    podb-db (Database Layer)                     │   │
//! │  │        SQLite schema, repositories, session load/commit         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`order`] - ActiveOrder, LineItemBuffer, Ledger and their events
//! - [`session`] - Unit of work over the purchase order tables
//! - [`conversion`] - Scaled integer money and percentage conversions
//! - [`types`] - Domain types (Supplier, Product, PurchaseOrder, etc.)
//! - [`config`] - Application settings (currency scale, number prefix)
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use podb_core::order::{ActiveOrder, ProductKey};
//! use podb_core::types::*;
//! use podb_core::{AppConfig, Session};
//!
//! let mut session = Session::new();
//! let acme = session.add_supplier(NewSupplier::new("Acme")).unwrap();
//! session
//!     .add_product(NewProduct {
//!         supplier_id: acme,
//!         part_number: "B-10".into(),
//!         description: "Bolt 10mm".into(),
//!         current_price: 1000, // 10.00
//!         current_discount: 0,
//!     })
//!     .unwrap();
//! session
//!     .add_project(NewProject { code: "WH01".into(), description: "Warehouse".into() })
//!     .unwrap();
//! session
//!     .add_config(
//!         NewConfigSnapshot {
//!             company_physical_address: "12 Foundry Lane".into(),
//!             company_gps: None,
//!             company_postal_address: "PO Box 40".into(),
//!             company_phone: "021 555 0100".into(),
//!             company_fax: None,
//!             company_email: None,
//!             company_web_address: None,
//!             signatory_name: "J. Leal".into(),
//!             default_payment_terms: PaymentTerms::PayIn30Days,
//!             default_order_status: OrderStatus::Draft,
//!             tax_rate: 15,
//!         },
//!         Utc::now(),
//!     )
//!     .unwrap();
//!
//! let config = AppConfig::default();
//! let mut order = ActiveOrder::new(&mut session, &config).unwrap();
//! order
//!     .select_product(&mut session, 0, ProductKey::PartNumber("B-10"))
//!     .unwrap();
//! order.edit_quantity(&mut session, 0, 2).unwrap();
//!
//! // 2 x 10.00 plus 15% tax
//! assert_eq!(order.totals().including_tax, 2300);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod conversion;
pub mod error;
pub mod order;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{AppConfig, TaxRateSource};
pub use conversion::CurrencyScale;
pub use error::{ConversionError, CoreError, CoreResult, ValidationError};
pub use order::{ActiveOrder, EditOutcome, Ledger, LineItemBuffer, OrderEvent, OrderField};
pub use session::{ChangeSet, PendingOrderKey, Session, Tables};
