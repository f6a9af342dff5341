//! # Product Repository
//!
//! Database operations for supplier catalogs.
//!
//! ## Natural Keys
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product                                                                │
//! │                                                                         │
//! │  supplier_id │ part_number │ product_description │ price │ discount    │
//! │  ────────────┼─────────────┼─────────────────────┼───────┼──────────   │
//! │  1 (Acme)    │ B-10        │ Bolt 10mm           │ 1000  │ 10          │
//! │  1 (Acme)    │ N-10        │ Nut 10mm            │  250  │  0          │
//! │  2 (BoltCo)  │ B-10        │ Bolt 10mm           │ 1100  │  0   ← ok   │
//! │                                                                         │
//! │  UNIQUE (supplier_id, part_number)                                     │
//! │  UNIQUE (supplier_id, product_description)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Either key identifies a product on an order line, but only within the
//! order's supplier.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use podb_core::types::{Product, ProductId, SupplierId};

/// Row shape of the `product` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRecord {
    pub id: ProductId,
    pub supplier_id: SupplierId,
    pub part_number: String,
    pub product_description: String,
    pub current_price: i64,
    pub current_discount: i64,
    pub archived: bool,
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        Product {
            id: r.id,
            supplier_id: r.supplier_id,
            part_number: r.part_number,
            description: r.product_description,
            current_price: r.current_price,
            current_discount: r.current_discount,
            archived: r.archived,
        }
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT
        id, supplier_id, part_number, product_description,
        current_price, current_discount, archived
    FROM product
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// // Active catalog for the order's supplier
/// let choices = repo.list_for_supplier(order.supplier_id, false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product by id.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!("{SELECT_PRODUCT} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = records.len(), "Loaded products");
        Ok(records.into_iter().map(Product::from).collect())
    }

    /// Lists one supplier's catalog, ordered by part number.
    ///
    /// ## Arguments
    /// * `supplier_id` - Catalog owner
    /// * `include_archived` - Archived products stay visible on old orders
    ///   but are not offered for new lines
    pub async fn list_for_supplier(
        &self,
        supplier_id: SupplierId,
        include_archived: bool,
    ) -> DbResult<Vec<Product>> {
        debug!(supplier_id = %supplier_id, include_archived, "Listing supplier catalog");

        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "{SELECT_PRODUCT} WHERE supplier_id = ?1 AND (?2 OR archived = 0) ORDER BY part_number"
        ))
        .bind(supplier_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Product::from).collect())
    }

    /// Gets a product by id.
    pub async fn get_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Product::from))
    }

    /// Gets a product by part number within a supplier's catalog.
    pub async fn get_by_part_number(
        &self,
        supplier_id: SupplierId,
        part_number: &str,
    ) -> DbResult<Option<Product>> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "{SELECT_PRODUCT} WHERE supplier_id = ?1 AND part_number = ?2"
        ))
        .bind(supplier_id)
        .bind(part_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Product::from))
    }

    /// Inserts or updates a product.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, product).await
    }

    /// Inserts or updates a product on the given connection.
    pub async fn upsert_in(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(
            id = %product.id,
            supplier_id = %product.supplier_id,
            part_number = %product.part_number,
            "Upserting product"
        );

        sqlx::query(
            r#"
            INSERT INTO product (
                id, supplier_id, part_number, product_description,
                current_price, current_discount, archived
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (id) DO UPDATE SET
                supplier_id = excluded.supplier_id,
                part_number = excluded.part_number,
                product_description = excluded.product_description,
                current_price = excluded.current_price,
                current_discount = excluded.current_discount,
                archived = excluded.archived
            "#,
        )
        .bind(product.id)
        .bind(product.supplier_id)
        .bind(&product.part_number)
        .bind(&product.description)
        .bind(product.current_price)
        .bind(product.current_discount)
        .bind(product.archived)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Archives a product so it is no longer offered on new lines.
    pub async fn archive(&self, id: ProductId) -> DbResult<()> {
        debug!(id = %id, "Archiving product");

        let result = sqlx::query("UPDATE product SET archived = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use podb_core::types::{NewProduct, NewSupplier};

    async fn catalog() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, name) in [(1, "Acme"), (2, "BoltCo")] {
            db.suppliers()
                .upsert(&NewSupplier::new(name).into_supplier(SupplierId(id)))
                .await
                .unwrap();
        }

        let products = [
            (1, 1, "N-10", "Nut 10mm", 250),
            (2, 1, "B-10", "Bolt 10mm", 1000),
            (3, 2, "B-10", "Bolt 10mm", 1100),
        ];
        for (id, supplier, part, description, price) in products {
            let product = NewProduct {
                supplier_id: SupplierId(supplier),
                part_number: part.to_string(),
                description: description.to_string(),
                current_price: price,
                current_discount: 0,
            };
            db.products()
                .upsert(&product.into_product(ProductId(id)))
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_list_for_supplier_sorted() {
        let db = catalog().await;

        let acme = db.products().list_for_supplier(SupplierId(1), false).await.unwrap();
        let parts: Vec<_> = acme.iter().map(|p| p.part_number.as_str()).collect();
        assert_eq!(parts, vec!["B-10", "N-10"]);
    }

    #[tokio::test]
    async fn test_archived_hidden_unless_requested() {
        let db = catalog().await;
        db.products().archive(ProductId(1)).await.unwrap();

        let active = db.products().list_for_supplier(SupplierId(1), false).await.unwrap();
        let all = db.products().list_for_supplier(SupplierId(1), true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_same_part_number_other_supplier() {
        let db = catalog().await;

        let bolt = db
            .products()
            .get_by_part_number(SupplierId(2), "B-10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bolt.current_price, 1100);
    }

    #[tokio::test]
    async fn test_duplicate_description_within_supplier() {
        let db = catalog().await;
        let clash = NewProduct {
            supplier_id: SupplierId(1),
            part_number: "B-11".to_string(),
            description: "Bolt 10mm".to_string(),
            current_price: 900,
            current_discount: 0,
        };

        let err = db
            .products()
            .upsert(&clash.into_product(ProductId(4)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_supplier_rejected() {
        let db = catalog().await;
        let orphan = NewProduct {
            supplier_id: SupplierId(99),
            part_number: "Z-1".to_string(),
            description: "Orphan".to_string(),
            current_price: 1,
            current_discount: 0,
        };

        let err = db
            .products()
            .upsert(&orphan.into_product(ProductId(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_archive_missing() {
        let db = catalog().await;

        let err = db.products().archive(ProductId(42)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
