//! # Supplier Repository
//!
//! Database operations for suppliers. `company_name` is the natural key the
//! order form uses to pick a supplier.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use podb_core::types::{Supplier, SupplierId};

/// Row shape of the `supplier` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierRecord {
    pub id: SupplierId,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub web_address: Option<String>,
    pub tax_number: Option<String>,
    pub physical_address: Option<String>,
    pub postal_address: Option<String>,
    pub archived: bool,
}

impl From<SupplierRecord> for Supplier {
    fn from(r: SupplierRecord) -> Self {
        Supplier {
            id: r.id,
            company_name: r.company_name,
            contact_name: r.contact_name,
            phone: r.phone,
            fax: r.fax,
            email: r.email,
            web_address: r.web_address,
            tax_number: r.tax_number,
            physical_address: r.physical_address,
            postal_address: r.postal_address,
            archived: r.archived,
        }
    }
}

const SELECT_SUPPLIER: &str = r#"
    SELECT
        id, company_name, contact_name, phone, fax, email,
        web_address, tax_number, physical_address, postal_address, archived
    FROM supplier
"#;

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Lists every supplier, archived included, by id.
    pub async fn list_all(&self) -> DbResult<Vec<Supplier>> {
        let records =
            sqlx::query_as::<_, SupplierRecord>(&format!("{SELECT_SUPPLIER} ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = records.len(), "Loaded suppliers");
        Ok(records.into_iter().map(Supplier::from).collect())
    }

    /// Gets a supplier by id.
    pub async fn get_by_id(&self, id: SupplierId) -> DbResult<Option<Supplier>> {
        let record =
            sqlx::query_as::<_, SupplierRecord>(&format!("{SELECT_SUPPLIER} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record.map(Supplier::from))
    }

    /// Gets a supplier by its company name.
    pub async fn get_by_name(&self, company_name: &str) -> DbResult<Option<Supplier>> {
        let record = sqlx::query_as::<_, SupplierRecord>(&format!(
            "{SELECT_SUPPLIER} WHERE company_name = ?1"
        ))
        .bind(company_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Supplier::from))
    }

    /// Inserts or updates a supplier.
    pub async fn upsert(&self, supplier: &Supplier) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, supplier).await
    }

    /// Inserts or updates a supplier on the given connection.
    pub async fn upsert_in(conn: &mut SqliteConnection, supplier: &Supplier) -> DbResult<()> {
        debug!(id = %supplier.id, name = %supplier.company_name, "Upserting supplier");

        sqlx::query(
            r#"
            INSERT INTO supplier (
                id, company_name, contact_name, phone, fax, email,
                web_address, tax_number, physical_address, postal_address, archived
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT (id) DO UPDATE SET
                company_name = excluded.company_name,
                contact_name = excluded.contact_name,
                phone = excluded.phone,
                fax = excluded.fax,
                email = excluded.email,
                web_address = excluded.web_address,
                tax_number = excluded.tax_number,
                physical_address = excluded.physical_address,
                postal_address = excluded.postal_address,
                archived = excluded.archived
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.company_name)
        .bind(&supplier.contact_name)
        .bind(&supplier.phone)
        .bind(&supplier.fax)
        .bind(&supplier.email)
        .bind(&supplier.web_address)
        .bind(&supplier.tax_number)
        .bind(&supplier.physical_address)
        .bind(&supplier.postal_address)
        .bind(supplier.archived)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
