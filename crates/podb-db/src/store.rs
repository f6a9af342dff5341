//! # Session Store
//!
//! Moves a [`Session`] in and out of SQLite.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Editing Session                                    │
//! │                                                                         │
//! │  db.load_session()          every table read into Session (committed)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ActiveOrder edits          synchronous, no database access            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  order.pre_commit()         drop entry row, write buffer to session    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.commit_session()        flush → changes() → ONE transaction        │
//! │       │                        suppliers, projects, configs, products  │
//! │       │                        deleted orders, order headers, lines    │
//! │       │                                                                 │
//! │       ├── Ok  ──► session.commit(), then order.post_commit()           │
//! │       └── Err ──► nothing written, session keeps its edits             │
//! │                   (caller may session.rollback() + post_rollback())    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write order follows the foreign keys: rows are written after
//! everything they reference.

use podb_core::session::{Session, Tables};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::config::ConfigRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::project::ProjectRepository;
use crate::repository::supplier::SupplierRepository;

impl Database {
    /// Reads every table into a fresh [`Session`].
    pub async fn load_session(&self) -> DbResult<Session> {
        let mut tables = Tables::default();

        for supplier in self.suppliers().list_all().await? {
            tables.suppliers.insert(supplier.id, supplier);
        }
        for product in self.products().list_all().await? {
            tables.products.insert(product.id, product);
        }
        for project in self.projects().list_all().await? {
            tables.projects.insert(project.id, project);
        }
        for config in self.configs().list_all().await? {
            tables.configs.insert(config.id, config);
        }
        for order in self.orders().list_all().await? {
            if let Some(id) = order.id {
                tables.orders.insert(id, order);
            }
        }
        for line in self.orders().list_all_lines().await? {
            tables.order_lines.entry(line.order_id).or_default().push(line);
        }

        info!(
            suppliers = tables.suppliers.len(),
            products = tables.products.len(),
            orders = tables.orders.len(),
            "Session loaded"
        );

        Ok(Session::from_tables(tables))
    }

    /// Writes a session's pending changes in one transaction.
    ///
    /// ## What This Does
    /// 1. Flushes pending orders so they have ids
    /// 2. Diffs the working set against the committed state
    /// 3. Writes the diff in one transaction
    /// 4. On success, promotes the session's working set
    ///
    /// ## Errors
    /// Any error leaves the database untouched and the session uncommitted.
    /// Constraint failures come back as `UniqueViolation` or
    /// `ForeignKeyViolation`; begin/commit failures as `TransactionFailed`.
    pub async fn commit_session(&self, session: &mut Session) -> DbResult<()> {
        session.flush();
        let changes = session.changes();

        if changes.is_empty() {
            debug!("Nothing to commit");
            session.commit();
            return Ok(());
        }

        info!(
            suppliers = changes.suppliers.len(),
            products = changes.products.len(),
            projects = changes.projects.len(),
            configs = changes.configs.len(),
            orders = changes.orders.len(),
            deleted_orders = changes.deleted_orders.len(),
            line_lists = changes.order_lines.len(),
            "Committing session"
        );

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let written = async {
            for supplier in &changes.suppliers {
                SupplierRepository::upsert_in(&mut tx, supplier).await?;
            }
            for project in &changes.projects {
                ProjectRepository::upsert_in(&mut tx, project).await?;
            }
            for config in &changes.configs {
                ConfigRepository::insert_in(&mut tx, config).await?;
            }
            for product in &changes.products {
                ProductRepository::upsert_in(&mut tx, product).await?;
            }
            for id in &changes.deleted_orders {
                OrderRepository::delete_in(&mut tx, *id).await?;
            }
            for order in &changes.orders {
                OrderRepository::upsert_in(&mut tx, order).await?;
            }
            for (order_id, lines) in &changes.order_lines {
                OrderRepository::replace_lines_in(&mut tx, *order_id, lines).await?;
            }
            Ok::<(), DbError>(())
        }
        .await;

        if let Err(err) = written {
            warn!(error = %err, "Commit failed, rolling back");
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            return Err(err);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        session.commit();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
