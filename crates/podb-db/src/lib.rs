//! # podb-db: Database Layer for PODB
//!
//! SQLite persistence for purchase orders. Editing happens in `podb-core`
//! against a [`Session`](podb_core::Session); this crate fills that session
//! from the database and writes it back in one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PODB Data Flow                                   │
//! │                                                                         │
//! │  Order form                                                            │
//! │       │ ActiveOrder edits (podb-core, synchronous)                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     podb-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ supplier      │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ product       │    │ 001_initial  │  │   │
//! │  │   │ load_session  │    │ project       │    │              │  │   │
//! │  │   │ commit_session│    │ config, order │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   settings: config.toml + PODB_* env → AppConfig               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Per-table repositories
//! - [`store`] - Session load and commit
//! - [`settings`] - Application config file and environment
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use podb_core::order::{ActiveOrder, ProductKey};
//! use podb_db::{settings, Database, DbConfig};
//!
//! let app_config = settings::load_app_config(None)?;
//! let db = Database::new(DbConfig::new(settings::database_path(&app_config)?)).await?;
//!
//! let mut session = db.load_session().await?;
//! let mut order = ActiveOrder::new(&mut session, &app_config)?;
//! order.select_product(&mut session, 0, ProductKey::PartNumber("B-10"))?;
//!
//! order.pre_commit(&mut session)?;
//! db.commit_session(&mut session).await?;
//! order.post_commit();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod settings;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::config::ConfigRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::project::ProjectRepository;
pub use repository::supplier::SupplierRepository;
