//! # Repository Module
//!
//! Database repository implementations for PODB.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Database::load_session / commit_session                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  XRepository                                                           │
//! │  ├── list_all(&self)            pool reads                             │
//! │  ├── get_by_*(&self, ..)                                               │
//! │  ├── upsert(&self, row)         pool write, single statement           │
//! │  └── upsert_in(conn, row)       same write inside a caller's txn       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  XRecord (sqlx::FromRow) ──From──► podb_core::types::X                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers
//! - [`ProductRepository`](product::ProductRepository) - Supplier catalogs
//! - [`ProjectRepository`](project::ProjectRepository) - Project codes
//! - [`ConfigRepository`](config::ConfigRepository) - Append-only config snapshots
//! - [`OrderRepository`](order::OrderRepository) - Purchase orders and their lines

pub mod config;
pub mod order;
pub mod product;
pub mod project;
pub mod supplier;
