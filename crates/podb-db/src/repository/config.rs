//! # Config Snapshot Repository
//!
//! Company configuration is append-only: every change is a new
//! `config_snapshot` row, and orders keep pointing at the snapshot their
//! totals were computed with.
//!
//! ```text
//! config_snapshot
//! ┌────┬─────────────────────┬──────────┐
//! │ id │ created_at          │ tax_rate │
//! ├────┼─────────────────────┼──────────┤
//! │ 1  │ 2024-01-01 08:00:00 │ 15       │ ◄── PO00001.config_id
//! │ 2  │ 2025-04-01 08:00:00 │ 16       │ ◄── latest()
//! └────┴─────────────────────┴──────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use podb_core::types::{ConfigId, ConfigSnapshot, OrderStatus, PaymentTerms};

/// Row shape of the `config_snapshot` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfigRecord {
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
    pub tax_rate: i64,
}

impl From<ConfigRecord> for ConfigSnapshot {
    fn from(r: ConfigRecord) -> Self {
        ConfigSnapshot {
            id: r.id,
            created_at: r.created_at,
            company_physical_address: r.company_physical_address,
            company_gps: r.company_gps,
            company_postal_address: r.company_postal_address,
            company_phone: r.company_phone,
            company_fax: r.company_fax,
            company_email: r.company_email,
            company_web_address: r.company_web_address,
            signatory_name: r.signatory_name,
            default_payment_terms: r.default_payment_terms,
            default_order_status: r.default_order_status,
            tax_rate: r.tax_rate,
        }
    }
}

const SELECT_CONFIG: &str = r#"
    SELECT
        id, created_at, company_physical_address, company_gps,
        company_postal_address, company_phone, company_fax, company_email,
        company_web_address, signatory_name, default_payment_terms,
        default_order_status, tax_rate
    FROM config_snapshot
"#;

/// Repository for config snapshot operations.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    /// Lists every snapshot, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<ConfigSnapshot>> {
        let records = sqlx::query_as::<_, ConfigRecord>(&format!(
            "{SELECT_CONFIG} ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Loaded config snapshots");
        Ok(records.into_iter().map(ConfigSnapshot::from).collect())
    }

    /// Returns the most recently created snapshot.
    ///
    /// Ties on `created_at` go to the higher id, matching
    /// `Session::latest_config`.
    pub async fn latest(&self) -> DbResult<Option<ConfigSnapshot>> {
        let record = sqlx::query_as::<_, ConfigRecord>(&format!(
            "{SELECT_CONFIG} ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ConfigSnapshot::from))
    }

    /// Appends a snapshot.
    pub async fn insert(&self, config: &ConfigSnapshot) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, config).await
    }

    /// Appends a snapshot on the given connection.
    ///
    /// Snapshots are never updated; re-inserting an id is a unique violation.
    pub async fn insert_in(conn: &mut SqliteConnection, config: &ConfigSnapshot) -> DbResult<()> {
        debug!(id = %config.id, tax_rate = config.tax_rate, "Inserting config snapshot");

        sqlx::query(
            r#"
            INSERT INTO config_snapshot (
                id, created_at, company_physical_address, company_gps,
                company_postal_address, company_phone, company_fax, company_email,
                company_web_address, signatory_name, default_payment_terms,
                default_order_status, tax_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(config.id)
        .bind(config.created_at)
        .bind(&config.company_physical_address)
        .bind(&config.company_gps)
        .bind(&config.company_postal_address)
        .bind(&config.company_phone)
        .bind(&config.company_fax)
        .bind(&config.company_email)
        .bind(&config.company_web_address)
        .bind(&config.signatory_name)
        .bind(config.default_payment_terms)
        .bind(config.default_order_status)
        .bind(config.tax_rate)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
