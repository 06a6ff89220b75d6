//! Fiscal-year numbering and archival service
//!
//! Batch and blend numbers restart every fiscal year (April to March). The
//! counters live in their own table and are advanced with a single upsert so
//! concurrent allocations never hand out the same number.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use shared::models::{fiscal_year_for_date, next_fiscal_year, BatchType};
use shared::validation::validate_fiscal_year_token;

use crate::error::{AppError, AppResult};

/// Counter for production batch numbers
pub const COUNTER_PRODUCTION_BATCH: &str = "production_batch";
/// Counter for outsourced batch numbers
pub const COUNTER_OUTSOURCE_BATCH: &str = "outsource_batch";
/// Counter for blend lot serial numbers
pub const COUNTER_BLEND_SERIAL: &str = "blend_serial";

/// Counter kind for a batch type
pub fn counter_kind_for(batch_type: BatchType) -> &'static str {
    match batch_type {
        BatchType::Production => COUNTER_PRODUCTION_BATCH,
        BatchType::Outsource => COUNTER_OUTSOURCE_BATCH,
    }
}

/// Allocate the next number from a fiscal-year counter.
///
/// The upsert seeds the counter at its first use and advances it atomically,
/// so two transactions allocating concurrently get distinct numbers.
pub(crate) async fn next_counter_value(
    conn: &mut PgConnection,
    fiscal_year: &str,
    counter_kind: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO fiscal_year_counters (fiscal_year, counter_kind, next_number)
        VALUES ($1, $2, 2)
        ON CONFLICT (fiscal_year, counter_kind)
        DO UPDATE SET next_number = fiscal_year_counters.next_number + 1
        RETURNING next_number - 1
        "#,
    )
    .bind(fiscal_year)
    .bind(counter_kind)
    .fetch_one(conn)
    .await
}

/// Record an explicitly supplied number against a counter.
///
/// The counter only ever moves forward: a manual number below the current
/// watermark leaves it untouched.
pub(crate) async fn claim_counter_value(
    conn: &mut PgConnection,
    fiscal_year: &str,
    counter_kind: &str,
    number: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO fiscal_year_counters (fiscal_year, counter_kind, next_number)
        VALUES ($1, $2, $3 + 1)
        ON CONFLICT (fiscal_year, counter_kind)
        DO UPDATE SET next_number = GREATEST(fiscal_year_counters.next_number, $3 + 1)
        "#,
    )
    .bind(fiscal_year)
    .bind(counter_kind)
    .bind(number)
    .execute(conn)
    .await?;

    Ok(())
}

/// Reject writes into a fiscal year that has already been archived.
///
/// Archival freezes the year's counters; letting a later insert draw from
/// them would silently reopen the closed year.
pub(crate) async fn assert_fiscal_year_open(
    conn: &mut PgConnection,
    fiscal_year: &str,
) -> AppResult<()> {
    let archived: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM fiscal_year_archives WHERE old_fiscal_year = $1 LIMIT 1",
    )
    .bind(fiscal_year)
    .fetch_optional(conn)
    .await?;

    if archived.is_some() {
        return Err(AppError::Validation {
            field: "fiscal_year".to_string(),
            message: format!("Fiscal year {} is archived and closed for new batches", fiscal_year),
        });
    }

    Ok(())
}

/// Counter state for display
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CounterInfo {
    pub fiscal_year: String,
    pub counter_kind: String,
    pub next_number: i32,
}

/// Archive record for one batch type of a closed fiscal year
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ArchiveEntry {
    pub old_fiscal_year: String,
    pub new_fiscal_year: String,
    pub batch_type: String,
    pub max_batch_number: i32,
    pub archived_count: i32,
}

/// Result of a year-end rollover
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub old_fiscal_year: String,
    pub new_fiscal_year: String,
    pub entries: Vec<ArchiveEntry>,
}

/// Input for the rollover operation
#[derive(Debug, Deserialize)]
pub struct ArchiveInput {
    pub fiscal_year: String,
}

/// Fiscal year service
#[derive(Clone)]
pub struct FiscalYearService {
    db: PgPool,
}

impl FiscalYearService {
    /// Create a new FiscalYearService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fiscal year the current date falls in
    pub fn current_fiscal_year(&self) -> String {
        fiscal_year_for_date(Utc::now().date_naive())
    }

    /// All counters for a fiscal year
    pub async fn list_counters(&self, fiscal_year: &str) -> AppResult<Vec<CounterInfo>> {
        validate_fiscal_year_token(fiscal_year).map_err(|msg| AppError::Validation {
            field: "fiscal_year".to_string(),
            message: msg.to_string(),
        })?;

        let counters = sqlx::query_as::<_, CounterInfo>(
            r#"
            SELECT fiscal_year, counter_kind, next_number
            FROM fiscal_year_counters
            WHERE fiscal_year = $1
            ORDER BY counter_kind
            "#,
        )
        .bind(fiscal_year)
        .fetch_all(&self.db)
        .await?;

        Ok(counters)
    }

    /// Close a fiscal year: record the final numbering state per batch type
    /// and seed the successor year's counters.
    ///
    /// Safe to run twice. The archive rows and counter seeds use
    /// ON CONFLICT DO NOTHING, so a retry after a partial failure
    /// completes without duplicating anything.
    pub async fn archive_fiscal_year(&self, old_fiscal_year: &str) -> AppResult<ArchiveSummary> {
        validate_fiscal_year_token(old_fiscal_year).map_err(|msg| AppError::Validation {
            field: "fiscal_year".to_string(),
            message: msg.to_string(),
        })?;

        let new_fiscal_year =
            next_fiscal_year(old_fiscal_year).map_err(|msg| AppError::Validation {
                field: "fiscal_year".to_string(),
                message: msg.to_string(),
            })?;

        let mut tx = self.db.begin().await?;

        for batch_type in [BatchType::Production, BatchType::Outsource] {
            let (max_number, count) = sqlx::query_as::<_, (Option<i32>, i64)>(
                r#"
                SELECT MAX(batch_number), COUNT(*)
                FROM batches
                WHERE fiscal_year = $1 AND batch_type = $2
                "#,
            )
            .bind(old_fiscal_year)
            .bind(batch_type.as_str())
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO fiscal_year_archives
                    (old_fiscal_year, new_fiscal_year, batch_type, max_batch_number, archived_count)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (old_fiscal_year, new_fiscal_year, batch_type) DO NOTHING
                "#,
            )
            .bind(old_fiscal_year)
            .bind(&new_fiscal_year)
            .bind(batch_type.as_str())
            .bind(max_number.unwrap_or(0))
            .bind(count as i32)
            .execute(&mut *tx)
            .await?;

            // Seed the successor counter so the new year starts at 1
            sqlx::query(
                r#"
                INSERT INTO fiscal_year_counters (fiscal_year, counter_kind, next_number)
                VALUES ($1, $2, 1)
                ON CONFLICT (fiscal_year, counter_kind) DO NOTHING
                "#,
            )
            .bind(&new_fiscal_year)
            .bind(counter_kind_for(batch_type))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO fiscal_year_counters (fiscal_year, counter_kind, next_number)
            VALUES ($1, $2, 1)
            ON CONFLICT (fiscal_year, counter_kind) DO NOTHING
            "#,
        )
        .bind(&new_fiscal_year)
        .bind(COUNTER_BLEND_SERIAL)
        .execute(&mut *tx)
        .await?;

        // Batches of the closed year drop out of the available pool
        sqlx::query("UPDATE batches SET is_active = false WHERE fiscal_year = $1")
            .bind(old_fiscal_year)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let entries = self.list_archives(old_fiscal_year).await?;

        tracing::info!(
            "Archived fiscal year {} into {}",
            old_fiscal_year,
            new_fiscal_year
        );

        Ok(ArchiveSummary {
            old_fiscal_year: old_fiscal_year.to_string(),
            new_fiscal_year,
            entries,
        })
    }

    /// Archive records for a closed fiscal year
    pub async fn list_archives(&self, old_fiscal_year: &str) -> AppResult<Vec<ArchiveEntry>> {
        let entries = sqlx::query_as::<_, ArchiveEntry>(
            r#"
            SELECT old_fiscal_year, new_fiscal_year, batch_type, max_batch_number, archived_count
            FROM fiscal_year_archives
            WHERE old_fiscal_year = $1
            ORDER BY batch_type
            "#,
        )
        .bind(old_fiscal_year)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
