//! # Order Repository
//!
//! Database operations for purchase orders and their line items.
//!
//! ## Line Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Buffer rows (in memory)          purchase_order_line                   │
//! │                                                                         │
//! │  0  B-10  10.00  10%  x3   ──►   order_id │ line_position │ product_id  │
//! │  1  N-10   2.50   0%  x2   ──►   ─────────┼───────────────┼─────────    │
//! │  2  (sentinel, never stored)      7       │ 0             │ 1           │
//! │                                   7       │ 1             │ 2           │
//! │                                                                         │
//! │  replace_lines_in: DELETE all lines of the order, then INSERT in order  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines have no identity of their own: a commit always writes the whole
//! list for an order. Deleting an order cascades to its lines.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use podb_core::error::{CoreError, ValidationError};
use podb_core::types::{
    ConfigId, OrderId, OrderLine, OrderStatus, PaymentTerms, ProductId, ProjectId, PurchaseOrder,
    SupplierId,
};

// =============================================================================
// Records
// =============================================================================

/// Row shape of the `purchase_order` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: OrderId,
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
    pub config_id: ConfigId,
}

impl From<OrderRecord> for PurchaseOrder {
    fn from(r: OrderRecord) -> Self {
        PurchaseOrder {
            id: Some(r.id),
            order_number: r.order_number,
            order_date: r.order_date,
            delivery_date: r.delivery_date,
            delivery_address: r.delivery_address,
            delivery_gps: r.delivery_gps,
            payment_terms: r.payment_terms,
            order_status: r.order_status,
            notes: r.notes,
            total_excluding_tax: r.total_excluding_tax,
            total_tax: r.total_tax,
            total_including_tax: r.total_including_tax,
            project_id: r.project_id,
            supplier_id: r.supplier_id,
            config_id: r.config_id,
        }
    }
}

/// Row shape of the `purchase_order_line` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderLineRecord {
    pub order_id: OrderId,
    pub line_position: i64,
    pub product_id: ProductId,
    pub unit_price: i64,
    pub discount: i64,
    pub quantity: i64,
}

impl From<OrderLineRecord> for OrderLine {
    fn from(r: OrderLineRecord) -> Self {
        OrderLine {
            order_id: r.order_id,
            product_id: Some(r.product_id),
            unit_price: r.unit_price,
            discount: r.discount,
            quantity: r.quantity,
        }
    }
}

const SELECT_ORDER: &str = r#"
    SELECT
        id, order_number, order_date, delivery_date, delivery_address,
        delivery_gps, payment_terms, order_status, notes,
        total_excluding_tax, total_tax, total_including_tax,
        project_id, supplier_id, config_id
    FROM purchase_order
"#;

const SELECT_LINE: &str = r#"
    SELECT order_id, line_position, product_id, unit_price, discount, quantity
    FROM purchase_order_line
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchase order operations.
///
/// ## Usage
/// ```rust,ignore
/// let orders = db.orders();
///
/// let po = orders.get_by_number("PO00042").await?;
/// let lines = orders.lines_for(po.id.unwrap()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Lists every order by id.
    pub async fn list_all(&self) -> DbResult<Vec<PurchaseOrder>> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!("{SELECT_ORDER} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = records.len(), "Loaded purchase orders");
        Ok(records.into_iter().map(PurchaseOrder::from).collect())
    }

    /// Gets an order by id.
    pub async fn get_by_id(&self, id: OrderId) -> DbResult<Option<PurchaseOrder>> {
        let record = sqlx::query_as::<_, OrderRecord>(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(PurchaseOrder::from))
    }

    /// Gets an order by its order number.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no order carries that number
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<PurchaseOrder> {
        sqlx::query_as::<_, OrderRecord>(&format!("{SELECT_ORDER} WHERE order_number = ?1"))
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?
            .map(PurchaseOrder::from)
            .ok_or_else(|| DbError::not_found("Purchase order", order_number))
    }

    /// Counts stored orders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_order")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lists every stored line, grouped by order and in position order.
    pub async fn list_all_lines(&self) -> DbResult<Vec<OrderLine>> {
        let records = sqlx::query_as::<_, OrderLineRecord>(&format!(
            "{SELECT_LINE} ORDER BY order_id, line_position"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Loaded order lines");
        Ok(records.into_iter().map(OrderLine::from).collect())
    }

    /// Lines of one order in position order.
    pub async fn lines_for(&self, order_id: OrderId) -> DbResult<Vec<OrderLine>> {
        let records = sqlx::query_as::<_, OrderLineRecord>(&format!(
            "{SELECT_LINE} WHERE order_id = ?1 ORDER BY line_position"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(OrderLine::from).collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts or updates an order header.
    pub async fn upsert(&self, order: &PurchaseOrder) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, order).await
    }

    /// Inserts or updates an order header on the given connection.
    ///
    /// ## Errors
    /// * `DbError::Core(NotFound)` - the order has not been flushed, so it
    ///   has no id to store under
    pub async fn upsert_in(conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
        let id = order
            .id
            .ok_or_else(|| CoreError::not_found("Order id", &order.order_number))?;

        debug!(
            id = %id,
            order_number = %order.order_number,
            total = order.total_including_tax,
            "Upserting purchase order"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_order (
                id, order_number, order_date, delivery_date, delivery_address,
                delivery_gps, payment_terms, order_status, notes,
                total_excluding_tax, total_tax, total_including_tax,
                project_id, supplier_id, config_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT (id) DO UPDATE SET
                order_number = excluded.order_number,
                order_date = excluded.order_date,
                delivery_date = excluded.delivery_date,
                delivery_address = excluded.delivery_address,
                delivery_gps = excluded.delivery_gps,
                payment_terms = excluded.payment_terms,
                order_status = excluded.order_status,
                notes = excluded.notes,
                total_excluding_tax = excluded.total_excluding_tax,
                total_tax = excluded.total_tax,
                total_including_tax = excluded.total_including_tax,
                project_id = excluded.project_id,
                supplier_id = excluded.supplier_id,
                config_id = excluded.config_id
            "#,
        )
        .bind(id)
        .bind(&order.order_number)
        .bind(order.order_date)
        .bind(order.delivery_date)
        .bind(&order.delivery_address)
        .bind(&order.delivery_gps)
        .bind(order.payment_terms)
        .bind(order.order_status)
        .bind(&order.notes)
        .bind(order.total_excluding_tax)
        .bind(order.total_tax)
        .bind(order.total_including_tax)
        .bind(order.project_id)
        .bind(order.supplier_id)
        .bind(order.config_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replaces every line of an order.
    pub async fn replace_lines(&self, order_id: OrderId, lines: &[OrderLine]) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Self::replace_lines_in(&mut tx, order_id, lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Replaces every line of an order on the given connection.
    ///
    /// `line_position` is the index in `lines`.
    ///
    /// ## Errors
    /// * `DbError::Core(Validation)` - a line has no product; empty entry
    ///   rows must be dropped before committing
    pub async fn replace_lines_in(
        conn: &mut SqliteConnection,
        order_id: OrderId,
        lines: &[OrderLine],
    ) -> DbResult<()> {
        debug!(order_id = %order_id, count = lines.len(), "Replacing order lines");

        sqlx::query("DELETE FROM purchase_order_line WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;

        for (position, line) in lines.iter().enumerate() {
            let product_id = line.product_id.ok_or_else(|| {
                CoreError::Validation(ValidationError::Required {
                    field: format!("product on line {}", position + 1),
                })
            })?;

            sqlx::query(
                r#"
                INSERT INTO purchase_order_line (
                    order_id, line_position, product_id, unit_price, discount, quantity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(order_id)
            .bind(position as i64)
            .bind(product_id)
            .bind(line.unit_price)
            .bind(line.discount)
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Deletes an order and, by cascade, its lines.
    pub async fn delete(&self, id: OrderId) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_in(&mut conn, id).await
    }

    /// Deletes an order on the given connection.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no order has that id
    pub async fn delete_in(conn: &mut SqliteConnection, id: OrderId) -> DbResult<()> {
        debug!(id = %id, "Deleting purchase order");

        let result = sqlx::query("DELETE FROM purchase_order WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase order", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
