//! # Domain Types
//!
//! Core domain types used throughout PODB.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Supplier     │◄──│     Product     │   │     Project     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  company_name   │   │  part_number    │   │  code           │       │
//! │  │  (unique)       │   │  description    │   │  (unique)       │       │
//! │  └────────▲────────┘   │  current_price  │   └────────▲────────┘       │
//! │           │            └────────▲────────┘            │                │
//! │           │                     │                     │                │
//! │  ┌────────┴─────────────────────┼─────────────────────┴────────┐       │
//! │  │                     PurchaseOrder                            │       │
//! │  │  order_number, dates, terms, status, three totals            │       │
//! │  │  supplier_id, project_id, config_id ──► ConfigSnapshot       │       │
//! │  └──────────────────────────────▲───────────────────────────────┘       │
//! │                                 │                                       │
//! │                        ┌────────┴────────┐                              │
//! │                        │    OrderLine    │  price + discount snapshotted│
//! │                        │  product_id     │  when the product is picked  │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Arena Identity
//! Entities never own each other. Every relationship is a typed integer id
//! resolved through the [`Session`](crate::session::Session).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[inline]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Primary key of a [`Supplier`].
    SupplierId
);
id_type!(
    /// Primary key of a [`Product`].
    ProductId
);
id_type!(
    /// Primary key of a [`Project`].
    ProjectId
);
id_type!(
    /// Primary key of a [`PurchaseOrder`]. Assigned on flush.
    OrderId
);
id_type!(
    /// Primary key of a [`ConfigSnapshot`].
    ConfigId
);

// =============================================================================
// Payment Terms
// =============================================================================

/// Payment terms agreed with the supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum PaymentTerms {
    #[serde(rename = "Pay in advance")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Pay in advance"))]
    PayInAdvance,
    #[serde(rename = "Pay in 7 days")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Pay in 7 days"))]
    PayIn7Days,
    #[serde(rename = "Pay in 30 days")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Pay in 30 days"))]
    PayIn30Days,
    #[serde(rename = "Pay in 60 days")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Pay in 60 days"))]
    PayIn60Days,
    #[serde(rename = "Cash on delivery")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Cash on delivery"))]
    CashOnDelivery,
}

impl PaymentTerms {
    /// Every allowed value, in display order.
    pub const ALL: [PaymentTerms; 5] = [
        PaymentTerms::PayInAdvance,
        PaymentTerms::PayIn7Days,
        PaymentTerms::PayIn30Days,
        PaymentTerms::PayIn60Days,
        PaymentTerms::CashOnDelivery,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            PaymentTerms::PayInAdvance => "Pay in advance",
            PaymentTerms::PayIn7Days => "Pay in 7 days",
            PaymentTerms::PayIn30Days => "Pay in 30 days",
            PaymentTerms::PayIn60Days => "Pay in 60 days",
            PaymentTerms::CashOnDelivery => "Cash on delivery",
        }
    }
}

impl Default for PaymentTerms {
    fn default() -> Self {
        PaymentTerms::PayIn30Days
    }
}

impl fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentTerms {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentTerms::ALL
            .into_iter()
            .find(|terms| terms.label() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment terms".to_string(),
                allowed: PaymentTerms::ALL.iter().map(|t| t.label().to_string()).collect(),
            })
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Where a purchase order is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum OrderStatus {
    /// Order still to be placed.
    Draft,
    /// Order has been placed.
    Placed,
    /// All goods received.
    Received,
    /// Some goods received, but not all.
    Partial,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Placed,
        OrderStatus::Received,
        OrderStatus::Partial,
        OrderStatus::Cancelled,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::Placed => "Placed",
            OrderStatus::Received => "Received",
            OrderStatus::Partial => "Partial",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "order status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.label().to_string()).collect(),
            })
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A company goods are bought from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,

    /// Natural key, unique across suppliers.
    pub company_name: String,

    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub web_address: Option<String>,
    pub tax_number: Option<String>,
    pub physical_address: Option<String>,
    pub postal_address: Option<String>,

    /// Archived suppliers stay on historical orders only.
    pub archived: bool,
}

/// Fields for a supplier that has no id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub web_address: Option<String>,
    pub tax_number: Option<String>,
    pub physical_address: Option<String>,
    pub postal_address: Option<String>,
}

impl NewSupplier {
    pub fn new(company_name: impl Into<String>) -> Self {
        NewSupplier {
            company_name: company_name.into(),
            ..Default::default()
        }
    }

    pub fn into_supplier(self, id: SupplierId) -> Supplier {
        Supplier {
            id,
            company_name: self.company_name,
            contact_name: self.contact_name,
            phone: self.phone,
            fax: self.fax,
            email: self.email,
            web_address: self.web_address,
            tax_number: self.tax_number,
            physical_address: self.physical_address,
            postal_address: self.postal_address,
            archived: false,
        }
    }
}

/// A product in a supplier's catalog.
///
/// `part_number` and `description` are each unique within the supplier, so
/// either one identifies the product on an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub supplier_id: SupplierId,
    pub part_number: String,
    pub description: String,

    /// Scaled monetary integer.
    pub current_price: i64,

    /// Scaled percentage integer (0..=99).
    pub current_discount: i64,

    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub supplier_id: SupplierId,
    pub part_number: String,
    pub description: String,
    pub current_price: i64,
    pub current_discount: i64,
}

impl NewProduct {
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            supplier_id: self.supplier_id,
            part_number: self.part_number,
            description: self.description,
            current_price: self.current_price,
            current_discount: self.current_discount,
            archived: false,
        }
    }
}

/// A job that purchase orders are booked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,

    /// Natural key, at most six characters.
    pub code: String,

    pub description: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub code: String,
    pub description: String,
}

// =============================================================================
// Configuration Snapshot
// =============================================================================

/// Company details and order defaults at a point in time.
///
/// Snapshots are append-only. The most recently created one is the
/// "current" configuration; older ones stay referenced by the orders whose
/// totals they priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub id: ConfigId,
    pub created_at: DateTime<Utc>,
    pub company_physical_address: String,
    pub company_gps: Option<String>,
    pub company_postal_address: String,
    pub company_phone: String,
    pub company_fax: Option<String>,
    pub company_email: Option<String>,
    pub company_web_address: Option<String>,
    pub signatory_name: String,
    pub default_payment_terms: PaymentTerms,
    pub default_order_status: OrderStatus,

    /// Scaled percentage integer (0..=99).
    pub tax_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConfigSnapshot {
    pub company_physical_address: String,
    pub company_gps: Option<String>,
    pub company_postal_address: String,
    pub company_phone: String,
    pub company_fax: Option<String>,
    pub company_email: Option<String>,
    pub company_web_address: Option<String>,
    pub signatory_name: String,
    pub default_payment_terms: PaymentTerms,
    pub default_order_status: OrderStatus,
    pub tax_rate: i64,
}

impl NewConfigSnapshot {
    pub fn into_snapshot(self, id: ConfigId, created_at: DateTime<Utc>) -> ConfigSnapshot {
        ConfigSnapshot {
            id,
            created_at,
            company_physical_address: self.company_physical_address,
            company_gps: self.company_gps,
            company_postal_address: self.company_postal_address,
            company_phone: self.company_phone,
            company_fax: self.company_fax,
            company_email: self.company_email,
            company_web_address: self.company_web_address,
            signatory_name: self.signatory_name,
            default_payment_terms: self.default_payment_terms,
            default_order_status: self.default_order_status,
            tax_rate: self.tax_rate,
        }
    }
}

// =============================================================================
// Purchase Order
// =============================================================================

/// A purchase order record.
///
/// ## Totals
/// The three totals are derived: only the active order's recompute cascade
/// writes them. They are scaled monetary integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// `None` until the session is flushed.
    pub id: Option<OrderId>,

    /// `{prefix}{n:05}`, e.g. `PO00042`.
    pub order_number: String,

    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub delivery_address: String,
    pub delivery_gps: Option<String>,
    pub payment_terms: PaymentTerms,
    pub order_status: OrderStatus,
    pub notes: String,
    pub total_excluding_tax: i64,
    pub total_tax: i64,
    pub total_including_tax: i64,
    pub project_id: ProjectId,
    pub supplier_id: SupplierId,

    /// Configuration used when the totals were last computed.
    pub config_id: ConfigId,
}

/// A product line on a purchase order.
///
/// `unit_price` and `discount` are copied from the product when it is picked
/// and never follow later catalog price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,

    /// `None` only on a buffer row that has no product picked yet.
    pub product_id: Option<ProductId>,

    /// Scaled monetary integer.
    pub unit_price: i64,

    /// Scaled percentage integer (0..=99).
    pub discount: i64,

    pub quantity: i64,
}

impl OrderLine {
    /// The blank entry row: no product, zero price/discount, quantity 1.
    pub fn empty(order_id: OrderId) -> Self {
        OrderLine {
            order_id,
            product_id: None,
            unit_price: 0,
            discount: 0,
            quantity: 1,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_defaults() {
        assert_eq!(PaymentTerms::default(), PaymentTerms::PayIn30Days);
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
    }

    #[test]
    fn test_enum_labels_round_trip() {
        for terms in PaymentTerms::ALL {
            assert_eq!(terms.label().parse::<PaymentTerms>().unwrap(), terms);
        }
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_enum_rejects_unknown_label() {
        let err = "Pay whenever".parse::<PaymentTerms>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
        assert!("draft".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_enum_serializes_as_label() {
        let json = serde_json::to_string(&PaymentTerms::CashOnDelivery).unwrap();
        assert_eq!(json, "\"Cash on delivery\"");
    }

    #[test]
    fn test_empty_order_line() {
        let line = OrderLine::empty(OrderId(7));
        assert_eq!(line.product_id, None);
        assert_eq!(line.quantity, 1);
        assert_eq!((line.unit_price, line.discount), (0, 0));
    }
}
