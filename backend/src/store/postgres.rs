//! PostgreSQL store
//!
//! Entries and child records are kept as JSONB documents next to the columns
//! the engine filters on. A transaction updates the entry row guarded by
//! `workflow_status` and `version`, then upserts every child row by id.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shared::{EntryAggregate, PurchaseRate, SampleEntry};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ChildWrite, EntryStore, ExpectedState, RecordKind};
use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

const SCHEMA: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS sample_entries (
        id UUID PRIMARY KEY,
        workflow_status VARCHAR(32) NOT NULL,
        version BIGINT NOT NULL,
        data JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS entry_records (
        id UUID PRIMARY KEY,
        entry_id UUID NOT NULL REFERENCES sample_entries(id),
        kind VARCHAR(16) NOT NULL,
        lot_id UUID,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS entry_records_entry_idx ON entry_records (entry_id)",
    "CREATE INDEX IF NOT EXISTS entry_records_lot_idx ON entry_records (lot_id)",
    r#"
    CREATE TABLE IF NOT EXISTS purchase_rates (
        id UUID PRIMARY KEY,
        arrival_id UUID NOT NULL UNIQUE,
        status VARCHAR(16) NOT NULL,
        version BIGINT NOT NULL,
        data JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS purchase_rates_arrival_idx ON purchase_rates (arrival_id)",
];

/// PostgreSQL-backed entry store
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await?;
        Ok(Self::new(db))
    }

    /// Create the tables when missing
    pub async fn ensure_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.db).await?;
        }
        Ok(())
    }
}

fn encode_record(write: &ChildWrite) -> Result<Value, serde_json::Error> {
    match write {
        ChildWrite::Quality(r) => serde_json::to_value(r),
        ChildWrite::Cooking(r) => serde_json::to_value(r),
        ChildWrite::Offering(r) => serde_json::to_value(r),
        ChildWrite::Allotment(r) => serde_json::to_value(r),
        ChildWrite::Inspection(r) => serde_json::to_value(r),
        ChildWrite::Inventory(r) => serde_json::to_value(r),
        ChildWrite::Financial(r) => serde_json::to_value(r),
    }
}

fn decode_record(kind: &str, data: Value) -> AppResult<ChildWrite> {
    let write = match kind {
        "quality" => ChildWrite::Quality(serde_json::from_value(data)?),
        "cooking" => ChildWrite::Cooking(serde_json::from_value(data)?),
        "offering" => ChildWrite::Offering(serde_json::from_value(data)?),
        "allotment" => ChildWrite::Allotment(serde_json::from_value(data)?),
        "inspection" => ChildWrite::Inspection(serde_json::from_value(data)?),
        "inventory" => ChildWrite::Inventory(serde_json::from_value(data)?),
        "financial" => ChildWrite::Financial(serde_json::from_value(data)?),
        other => {
            return Err(AppError::PersistenceFailure(format!(
                "unknown record kind {}",
                other
            )))
        }
    };
    Ok(write)
}

#[async_trait]
impl EntryStore for PgStore {
    async fn insert_entry(&self, entry: &SampleEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sample_entries (id, workflow_status, version, data, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.workflow_status.as_str())
        .bind(entry.version)
        .bind(Json(entry))
        .bind(entry.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn load(&self, entry_id: Uuid) -> AppResult<Option<EntryAggregate>> {
        let entry = sqlx::query_scalar::<_, Json<SampleEntry>>(
            "SELECT data FROM sample_entries WHERE id = $1",
        )
        .bind(entry_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(Json(entry)) = entry else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, (String, Value)>(
            r#"
            SELECT kind, data
            FROM entry_records
            WHERE entry_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.db)
        .await?;

        let mut aggregate = EntryAggregate::new(entry);
        for (kind, data) in rows {
            decode_record(&kind, data)?.apply_to(&mut aggregate);
        }
        Ok(Some(aggregate))
    }

    async fn find_lot(&self, lot_id: Uuid) -> AppResult<Option<Uuid>> {
        let entry_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT entry_id FROM entry_records WHERE id = $1 AND kind = $2",
        )
        .bind(lot_id)
        .bind(RecordKind::Allotment.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(entry_id)
    }

    async fn save_transaction(
        &self,
        expected: ExpectedState,
        entry: &SampleEntry,
        writes: &[ChildWrite],
    ) -> AppResult<()> {
        let now = Utc::now();

        // Start transaction
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE sample_entries
            SET workflow_status = $1, version = $2, data = $3, updated_at = $4
            WHERE id = $5 AND workflow_status = $6 AND version = $7
            "#,
        )
        .bind(entry.workflow_status.as_str())
        .bind(entry.version)
        .bind(Json(entry))
        .bind(entry.updated_at)
        .bind(entry.id)
        .bind(expected.status.as_str())
        .bind(expected.version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sample_entries WHERE id = $1")
                .bind(entry.id)
                .fetch_one(&self.db)
                .await?;
            return Err(if exists == 0 {
                AppError::NotFound(format!("Sample entry {}", entry.id))
            } else {
                AppError::Conflict(format!(
                    "Sample entry {} is no longer {} v{}",
                    entry.id, expected.status, expected.version
                ))
            });
        }

        for write in writes {
            sqlx::query(
                r#"
                INSERT INTO entry_records (id, entry_id, kind, lot_id, data, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(write.id())
            .bind(entry.id)
            .bind(write.kind().as_str())
            .bind(write.lot_id())
            .bind(encode_record(write)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_purchase_rate(&self, rate_id: Uuid) -> AppResult<Option<PurchaseRate>> {
        let rate = sqlx::query_scalar::<_, Json<PurchaseRate>>(
            "SELECT data FROM purchase_rates WHERE id = $1",
        )
        .bind(rate_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(rate.map(|Json(r)| r))
    }

    async fn find_purchase_rate_by_arrival(&self, arrival_id: Uuid) -> AppResult<Option<PurchaseRate>> {
        let rate = sqlx::query_scalar::<_, Json<PurchaseRate>>(
            "SELECT data FROM purchase_rates WHERE arrival_id = $1",
        )
        .bind(arrival_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(rate.map(|Json(r)| r))
    }

    async fn save_purchase_rate(&self, rate: &PurchaseRate, expected_version: Option<i64>) -> AppResult<()> {
        let now = Utc::now();
        let affected = match expected_version {
            None => sqlx::query(
                r#"
                INSERT INTO purchase_rates (id, arrival_id, status, version, data, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(rate.id)
            .bind(rate.arrival_id)
            .bind(rate.status.as_str())
            .bind(rate.version)
            .bind(Json(rate))
            .bind(now)
            .execute(&self.db)
            .await?
            .rows_affected(),
            Some(expected) => sqlx::query(
                r#"
                UPDATE purchase_rates
                SET status = $1, version = $2, data = $3, updated_at = $4
                WHERE id = $5 AND version = $6
                "#,
            )
            .bind(rate.status.as_str())
            .bind(rate.version)
            .bind(Json(rate))
            .bind(now)
            .bind(rate.id)
            .bind(expected)
            .execute(&self.db)
            .await?
            .rows_affected(),
        };

        if affected == 0 {
            return Err(AppError::Conflict(format!(
                "Purchase rate {} for arrival {} was changed by another request",
                rate.id, rate.arrival_id
            )));
        }
        Ok(())
    }
}
