//! Batch registry service
//!
//! CRUD over production and outsourced batches, number allocation within the
//! fiscal year and the missing-number report.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{find_gaps, Batch, BatchType, NumberGap, QualityAttributes};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{
    validate_fiscal_year_token, validate_moisture_percent, validate_ph,
};

use crate::error::{AppError, AppResult};
use crate::services::fiscal_year::{
    assert_fiscal_year_open, claim_counter_value, counter_kind_for, next_counter_value,
};

/// Batch service for registry operations
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Database row for a batch, flattened quality columns included
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BatchRow {
    pub id: Uuid,
    pub fiscal_year: String,
    pub batch_type: String,
    pub batch_number: i32,
    pub bags: i32,
    pub bloom: Option<Decimal>,
    pub viscosity: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub ph: Option<Decimal>,
    pub conductivity: Option<Decimal>,
    pub moisture: Option<Decimal>,
    pub h2o2: Option<Decimal>,
    pub so2: Option<Decimal>,
    pub mesh: Option<Decimal>,
    pub color: Option<String>,
    pub clarity: Option<String>,
    pub odour: Option<String>,
    pub is_used: bool,
    pub used_in_blend: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const BATCH_COLUMNS: &str = "id, fiscal_year, batch_type, batch_number, bags, \
     bloom, viscosity, percentage, ph, conductivity, moisture, h2o2, so2, mesh, \
     color, clarity, odour, is_used, used_in_blend, is_active, created_at, updated_at";

impl BatchRow {
    pub(crate) fn into_batch(self) -> AppResult<Batch> {
        let batch_type = BatchType::from_str(&self.batch_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown batch type '{}'", self.batch_type))
        })?;

        Ok(Batch {
            id: self.id,
            fiscal_year: self.fiscal_year,
            batch_type,
            batch_number: self.batch_number,
            bags: self.bags,
            quality: QualityAttributes {
                bloom: self.bloom,
                viscosity: self.viscosity,
                percentage: self.percentage,
                ph: self.ph,
                conductivity: self.conductivity,
                moisture: self.moisture,
                h2o2: self.h2o2,
                so2: self.so2,
                mesh: self.mesh,
                color: self.color,
                clarity: self.clarity,
                odour: self.odour,
            },
            is_used: self.is_used,
            used_in_blend: self.used_in_blend,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Input for registering a batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    /// Defaults to the current fiscal year when omitted
    pub fiscal_year: Option<String>,
    pub batch_type: BatchType,
    /// Explicit number (paper records entered late); allocated when omitted
    pub batch_number: Option<i32>,
    pub bags: i32,
    #[serde(default)]
    pub quality: QualityAttributes,
}

/// Input for correcting a batch record
#[derive(Debug, Deserialize)]
pub struct UpdateBatchInput {
    pub bags: Option<i32>,
    pub quality: Option<QualityAttributes>,
}

/// Filter for batch listings
#[derive(Debug, Default, Deserialize)]
pub struct BatchFilter {
    pub fiscal_year: Option<String>,
    pub batch_type: Option<BatchType>,
    pub available_only: Option<bool>,
    pub created_from: Option<chrono::NaiveDate>,
    pub created_to: Option<chrono::NaiveDate>,
}

/// Missing batch numbers for one fiscal year and batch type
#[derive(Debug, Serialize)]
pub struct GapReport {
    pub fiscal_year: String,
    pub batch_type: BatchType,
    pub min_number: Option<i32>,
    pub max_number: Option<i32>,
    pub gaps: Vec<NumberGap>,
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new batch, allocating its number when none is given
    pub async fn create_batch(&self, input: CreateBatchInput) -> AppResult<Batch> {
        validate_quality(&input.quality)?;

        if input.bags < 0 {
            return Err(AppError::Validation {
                field: "bags".to_string(),
                message: "Bag count cannot be negative".to_string(),
            });
        }

        if let Some(number) = input.batch_number {
            if number <= 0 {
                return Err(AppError::Validation {
                    field: "batch_number".to_string(),
                    message: "Batch number must be positive".to_string(),
                });
            }
        }

        let fiscal_year = match input.fiscal_year {
            Some(fy) => {
                validate_fiscal_year_token(&fy).map_err(|msg| AppError::Validation {
                    field: "fiscal_year".to_string(),
                    message: msg.to_string(),
                })?;
                fy
            }
            None => shared::models::fiscal_year_for_date(Utc::now().date_naive()),
        };

        let counter_kind = counter_kind_for(input.batch_type);
        let mut tx = self.db.begin().await?;

        assert_fiscal_year_open(&mut *tx, &fiscal_year).await?;

        let batch_number = match input.batch_number {
            Some(number) => {
                claim_counter_value(&mut *tx, &fiscal_year, counter_kind, number).await?;
                number
            }
            None => next_counter_value(&mut *tx, &fiscal_year, counter_kind).await?,
        };

        let q = &input.quality;
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            INSERT INTO batches
                (fiscal_year, batch_type, batch_number, bags,
                 bloom, viscosity, percentage, ph, conductivity, moisture, h2o2, so2, mesh,
                 color, clarity, odour)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(&fiscal_year)
        .bind(input.batch_type.as_str())
        .bind(batch_number)
        .bind(input.bags)
        .bind(q.bloom)
        .bind(q.viscosity)
        .bind(q.percentage)
        .bind(q.ph)
        .bind(q.conductivity)
        .bind(q.moisture)
        .bind(q.h2o2)
        .bind(q.so2)
        .bind(q.mesh)
        .bind(&q.color)
        .bind(&q.clarity)
        .bind(&q.odour)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::DuplicateEntry(_) => AppError::DuplicateBatchNumber {
                batch_number,
                fiscal_year: fiscal_year.clone(),
            },
            other => other,
        })?;

        tx.commit().await?;

        row.into_batch()
    }

    /// Get a batch by ID
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        row.into_batch()
    }

    /// Paginated batch listing with optional filters
    pub async fn list_batches(
        &self,
        filter: BatchFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Batch>> {
        let batch_type = filter.batch_type.map(|t| t.as_str());
        let available_only = filter.available_only.unwrap_or(false);

        let total_items: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM batches
            WHERE ($1::text IS NULL OR fiscal_year = $1)
              AND ($2::text IS NULL OR batch_type = $2)
              AND (NOT $3 OR (is_used = false AND is_active = true))
              AND ($4::date IS NULL OR created_at::date >= $4)
              AND ($5::date IS NULL OR created_at::date <= $5)
            "#,
        )
        .bind(&filter.fiscal_year)
        .bind(batch_type)
        .bind(available_only)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {}
            FROM batches
            WHERE ($1::text IS NULL OR fiscal_year = $1)
              AND ($2::text IS NULL OR batch_type = $2)
              AND (NOT $3 OR (is_used = false AND is_active = true))
              AND ($4::date IS NULL OR created_at::date >= $4)
              AND ($5::date IS NULL OR created_at::date <= $5)
            ORDER BY fiscal_year DESC, batch_type, batch_number
            LIMIT $6 OFFSET $7
            "#,
            BATCH_COLUMNS
        ))
        .bind(&filter.fiscal_year)
        .bind(batch_type)
        .bind(available_only)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(|r| r.into_batch())
            .collect::<AppResult<Vec<_>>>()?;

        let total_pages = if total_items == 0 {
            0
        } else {
            ((total_items as u64).div_ceil(pagination.per_page as u64)) as u32
        };

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta {
                page: pagination.page,
                per_page: pagination.per_page,
                total_items: total_items as u64,
                total_pages,
            },
        })
    }

    /// Available batches for blending, ordered by batch number
    pub async fn list_available(
        &self,
        fiscal_year: &str,
        batch_type: Option<BatchType>,
    ) -> AppResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {}
            FROM batches
            WHERE fiscal_year = $1
              AND ($2::text IS NULL OR batch_type = $2)
              AND is_used = false AND is_active = true
            ORDER BY batch_type, batch_number
            "#,
            BATCH_COLUMNS
        ))
        .bind(fiscal_year)
        .bind(batch_type.map(|t| t.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|r| r.into_batch()).collect()
    }

    /// Correct bags or measurements on an unused batch
    pub async fn update_batch(&self, batch_id: Uuid, input: UpdateBatchInput) -> AppResult<Batch> {
        let existing = self.get_batch(batch_id).await?;

        if existing.is_used {
            return Err(AppError::AlreadyUsed { batch_id });
        }

        if let Some(bags) = input.bags {
            if bags < 0 {
                return Err(AppError::Validation {
                    field: "bags".to_string(),
                    message: "Bag count cannot be negative".to_string(),
                });
            }
        }

        let quality = match input.quality {
            Some(q) => {
                validate_quality(&q)?;
                q
            }
            None => existing.quality,
        };
        let bags = input.bags.unwrap_or(existing.bags);

        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            UPDATE batches
            SET bags = $1,
                bloom = $2, viscosity = $3, percentage = $4, ph = $5, conductivity = $6,
                moisture = $7, h2o2 = $8, so2 = $9, mesh = $10,
                color = $11, clarity = $12, odour = $13,
                updated_at = NOW()
            WHERE id = $14 AND is_used = false
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(bags)
        .bind(quality.bloom)
        .bind(quality.viscosity)
        .bind(quality.percentage)
        .bind(quality.ph)
        .bind(quality.conductivity)
        .bind(quality.moisture)
        .bind(quality.h2o2)
        .bind(quality.so2)
        .bind(quality.mesh)
        .bind(&quality.color)
        .bind(&quality.clarity)
        .bind(&quality.odour)
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        // Raced a concurrent mark-used between the read and the write
        .ok_or(AppError::AlreadyUsed { batch_id })?;

        row.into_batch()
    }

    /// Delete an unused batch (data-entry mistakes)
    pub async fn delete_batch(&self, batch_id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM batches WHERE id = $1 AND is_used = false")
            .bind(batch_id)
            .execute(&self.db)
            .await?;

        if deleted.rows_affected() == 0 {
            self.get_batch(batch_id).await?;
            return Err(AppError::AlreadyUsed { batch_id });
        }

        Ok(())
    }

    /// Manually mark a batch as used (consumed outside the blend workflow)
    pub async fn mark_used(&self, batch_id: Uuid) -> AppResult<Batch> {
        // Single guarded statement: of two concurrent calls only one matches
        // the is_used = false predicate, the other sees zero rows
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            UPDATE batches
            SET is_used = true, updated_at = NOW()
            WHERE id = $1 AND is_used = false
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => row.into_batch(),
            None => {
                self.get_batch(batch_id).await?;
                Err(AppError::AlreadyUsed { batch_id })
            }
        }
    }

    /// Return a manually marked batch to the available pool.
    ///
    /// A batch consumed by a blend stays locked until the blend is deleted.
    pub async fn mark_available(&self, batch_id: Uuid) -> AppResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            UPDATE batches
            SET is_used = false, updated_at = NOW()
            WHERE id = $1 AND used_in_blend IS NULL
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => row.into_batch(),
            None => {
                let existing = self.get_batch(batch_id).await?;
                match existing.used_in_blend {
                    Some(blend_id) => Err(AppError::Validation {
                        field: "used_in_blend".to_string(),
                        message: format!(
                            "Batch is consumed by blend {}, delete the blend to release it",
                            blend_id
                        ),
                    }),
                    None => Err(AppError::TransactionConflict),
                }
            }
        }
    }

    /// Missing batch numbers between the lowest and highest registered number
    pub async fn gap_report(
        &self,
        fiscal_year: &str,
        batch_type: BatchType,
    ) -> AppResult<GapReport> {
        validate_fiscal_year_token(fiscal_year).map_err(|msg| AppError::Validation {
            field: "fiscal_year".to_string(),
            message: msg.to_string(),
        })?;

        let numbers: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT batch_number
            FROM batches
            WHERE fiscal_year = $1 AND batch_type = $2
            ORDER BY batch_number
            "#,
        )
        .bind(fiscal_year)
        .bind(batch_type.as_str())
        .fetch_all(&self.db)
        .await?;

        let min_number = numbers.first().copied();
        let max_number = numbers.last().copied();

        let gaps = match (min_number, max_number) {
            (Some(min), Some(max)) => find_gaps(&numbers, min, max),
            _ => Vec::new(),
        };

        Ok(GapReport {
            fiscal_year: fiscal_year.to_string(),
            batch_type,
            min_number,
            max_number,
            gaps,
        })
    }
}

/// Range checks on the measurements that have hard physical bounds
pub(crate) fn validate_quality(quality: &QualityAttributes) -> AppResult<()> {
    if let Some(bloom) = quality.bloom {
        if bloom <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "bloom".to_string(),
                message: "Bloom must be positive".to_string(),
            });
        }
    }

    if let Some(ph) = quality.ph {
        validate_ph(ph).map_err(|msg| AppError::Validation {
            field: "ph".to_string(),
            message: msg.to_string(),
        })?;
    }

    if let Some(moisture) = quality.moisture {
        validate_moisture_percent(moisture).map_err(|msg| AppError::Validation {
            field: "moisture".to_string(),
            message: msg.to_string(),
        })?;
    }

    if let Some(percentage) = quality.percentage {
        if percentage < Decimal::ZERO || percentage > Decimal::from(100) {
            return Err(AppError::Validation {
                field: "percentage".to_string(),
                message: "Percentage must be between 0 and 100".to_string(),
            });
        }
    }

    Ok(())
}
