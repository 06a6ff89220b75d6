//! Blend service
//!
//! Preview, suggestion and commit of blends. The commit is one transaction:
//! the selected batches are locked and re-validated, the plan is recomputed
//! server-side, the lot serial is allocated and the batches are flipped to
//! used. Either everything lands or nothing does.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    format_lot_number, plan_blend, suggest_selection, AttributeAverage, Batch, BatchSelection,
    Blend, BlendPlan, BlendTarget, BloomSelectionMode, SelectedBatch,
};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::validate_fiscal_year_token;

use crate::error::{AppError, AppResult};
use crate::services::batch::{BatchRow, BATCH_COLUMNS};
use crate::services::fiscal_year::{next_counter_value, COUNTER_BLEND_SERIAL};

/// Blend service
#[derive(Clone)]
pub struct BlendService {
    db: PgPool,
}

/// Input for previewing or committing a blend
#[derive(Debug, Deserialize)]
pub struct CreateBlendInput {
    /// Defaults to the current fiscal year when omitted
    pub fiscal_year: Option<String>,
    pub target: BlendTarget,
    pub selected_batches: Vec<BatchSelection>,
}

/// Input for the automatic selection
#[derive(Debug, Deserialize)]
pub struct SuggestBlendInput {
    pub fiscal_year: Option<String>,
    pub target: BlendTarget,
    pub required_bags: i32,
}

/// Suggested selection together with its computed aggregates
#[derive(Debug, Serialize)]
pub struct SuggestedBlend {
    pub selected_batches: Vec<BatchSelection>,
    pub plan: BlendPlan,
}

/// Database row for a blend
#[derive(Debug, sqlx::FromRow)]
struct BlendRow {
    id: Uuid,
    fiscal_year: String,
    lot_number: String,
    serial_number: i32,
    bloom_min: Decimal,
    bloom_max: Decimal,
    mean_bloom: Option<Decimal>,
    target_mesh: Option<Decimal>,
    selection_mode: String,
    total_bags: i32,
    total_weight_kg: Decimal,
    average_bloom: Decimal,
    attribute_averages: serde_json::Value,
    created_at: DateTime<Utc>,
}

/// Database row for a selected-batch snapshot
#[derive(Debug, sqlx::FromRow)]
struct BlendBatchRow {
    blend_id: Uuid,
    batch_id: Uuid,
    batch_number: i32,
    bloom: Decimal,
    bags: i32,
    is_outsource: bool,
}

impl BlendRow {
    fn into_blend(self, selected_batches: Vec<SelectedBatch>) -> AppResult<Blend> {
        let selection_mode = BloomSelectionMode::from_str(&self.selection_mode).ok_or_else(
            || AppError::Internal(format!("Unknown selection mode '{}'", self.selection_mode)),
        )?;

        let attribute_averages: Vec<AttributeAverage> =
            serde_json::from_value(self.attribute_averages)
                .map_err(|e| AppError::Internal(format!("Corrupt attribute averages: {}", e)))?;

        Ok(Blend {
            id: self.id,
            fiscal_year: self.fiscal_year,
            lot_number: self.lot_number,
            serial_number: self.serial_number,
            target: BlendTarget {
                bloom_min: self.bloom_min,
                bloom_max: self.bloom_max,
                mean_bloom: self.mean_bloom,
                mesh: self.target_mesh,
                selection_mode,
            },
            selected_batches,
            total_bags: self.total_bags,
            total_weight_kg: self.total_weight_kg,
            average_bloom: self.average_bloom,
            attribute_averages,
            created_at: self.created_at,
        })
    }
}

const BLEND_COLUMNS: &str = "id, fiscal_year, lot_number, serial_number, \
     bloom_min, bloom_max, mean_bloom, target_mesh, selection_mode, \
     total_bags, total_weight_kg, average_bloom, attribute_averages, created_at";

impl BlendService {
    /// Create a new BlendService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn resolve_fiscal_year(&self, fiscal_year: Option<String>) -> AppResult<String> {
        match fiscal_year {
            Some(fy) => {
                validate_fiscal_year_token(&fy).map_err(|msg| AppError::Validation {
                    field: "fiscal_year".to_string(),
                    message: msg.to_string(),
                })?;
                Ok(fy)
            }
            None => Ok(shared::models::fiscal_year_for_date(Utc::now().date_naive())),
        }
    }

    /// Load the selected batches in caller order, without locking
    async fn load_selection(
        &self,
        selected: &[BatchSelection],
    ) -> AppResult<Vec<(Batch, i32)>> {
        let ids: Vec<Uuid> = selected.iter().map(|s| s.batch_id).collect();

        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE id = ANY($1)",
            BATCH_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_id: HashMap<Uuid, Batch> = HashMap::with_capacity(rows.len());
        for row in rows {
            let batch = row.into_batch()?;
            by_id.insert(batch.id, batch);
        }

        let mut result = Vec::with_capacity(selected.len());
        for entry in selected {
            let batch = by_id
                .remove(&entry.batch_id)
                .ok_or_else(|| AppError::NotFound(format!("Batch {}", entry.batch_id)))?;
            result.push((batch, entry.bags));
        }

        Ok(result)
    }

    /// Validate a selection and compute its aggregates without committing
    pub async fn preview_blend(&self, input: CreateBlendInput) -> AppResult<BlendPlan> {
        let selection = self.load_selection(&input.selected_batches).await?;
        let refs: Vec<(&Batch, i32)> = selection.iter().map(|(b, n)| (b, *n)).collect();
        let plan = plan_blend(&input.target, &refs)?;
        Ok(plan)
    }

    /// Automatically pick batches towards the required quantity
    pub async fn suggest_blend(&self, input: SuggestBlendInput) -> AppResult<SuggestedBlend> {
        let fiscal_year = self.resolve_fiscal_year(input.fiscal_year)?;

        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {}
            FROM batches
            WHERE fiscal_year = $1 AND is_used = false AND is_active = true
            ORDER BY batch_type, batch_number
            "#,
            BATCH_COLUMNS
        ))
        .bind(&fiscal_year)
        .fetch_all(&self.db)
        .await?;

        let available = rows
            .into_iter()
            .map(|r| r.into_batch())
            .collect::<AppResult<Vec<_>>>()?;

        let selected_batches = suggest_selection(&input.target, &available, input.required_bags)?;

        let by_id: HashMap<Uuid, &Batch> = available.iter().map(|b| (b.id, b)).collect();
        let refs: Vec<(&Batch, i32)> = selected_batches
            .iter()
            .map(|s| (by_id[&s.batch_id], s.bags))
            .collect();
        let plan = plan_blend(&input.target, &refs)?;

        Ok(SuggestedBlend {
            selected_batches,
            plan,
        })
    }

    /// Commit a blend: lock the batches, re-validate, allocate the lot serial
    /// and flip the sources to used, all in one transaction.
    pub async fn create_blend(&self, input: CreateBlendInput) -> AppResult<Blend> {
        let fiscal_year = self.resolve_fiscal_year(input.fiscal_year)?;

        let ids: Vec<Uuid> = input.selected_batches.iter().map(|s| s.batch_id).collect();

        let mut tx = self.db.begin().await?;

        // Lock the source rows in a stable order so concurrent commits on
        // overlapping selections queue instead of deadlocking
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM batches WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            BATCH_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut by_id: HashMap<Uuid, Batch> = HashMap::with_capacity(rows.len());
        for row in rows {
            let batch = row.into_batch()?;
            by_id.insert(batch.id, batch);
        }

        let mut selection: Vec<(Batch, i32)> = Vec::with_capacity(input.selected_batches.len());
        for entry in &input.selected_batches {
            let batch = by_id
                .remove(&entry.batch_id)
                .ok_or_else(|| AppError::NotFound(format!("Batch {}", entry.batch_id)))?;
            selection.push((batch, entry.bags));
        }

        let refs: Vec<(&Batch, i32)> = selection.iter().map(|(b, n)| (b, *n)).collect();
        let plan = plan_blend(&input.target, &refs)?;

        let serial_number =
            next_counter_value(&mut *tx, &fiscal_year, COUNTER_BLEND_SERIAL).await?;
        let lot_number = format_lot_number(&fiscal_year, serial_number);

        let attribute_averages = serde_json::to_value(&plan.attribute_averages)
            .map_err(|e| AppError::Internal(format!("Failed to encode averages: {}", e)))?;

        let blend_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO blends
                (fiscal_year, lot_number, serial_number,
                 bloom_min, bloom_max, mean_bloom, target_mesh, selection_mode,
                 total_bags, total_weight_kg, average_bloom, attribute_averages)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&fiscal_year)
        .bind(&lot_number)
        .bind(serial_number)
        .bind(input.target.bloom_min)
        .bind(input.target.bloom_max)
        .bind(input.target.mean_bloom)
        .bind(input.target.mesh)
        .bind(input.target.selection_mode.as_str())
        .bind(plan.total_bags)
        .bind(plan.total_weight_kg)
        .bind(plan.average_bloom)
        .bind(&attribute_averages)
        .fetch_one(&mut *tx)
        .await?;

        for (position, selected) in plan.selected.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO blend_batches
                    (blend_id, batch_id, position, batch_number, bloom, bags, is_outsource)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(blend_id)
            .bind(selected.batch_id)
            .bind(position as i32)
            .bind(selected.batch_number)
            .bind(selected.bloom)
            .bind(selected.bags)
            .bind(selected.is_outsource)
            .execute(&mut *tx)
            .await?;
        }

        // Guarded flip: if another commit slipped in between our lock and
        // this update the row count comes up short and we abort
        let updated = sqlx::query(
            r#"
            UPDATE batches
            SET is_used = true, used_in_blend = $1, updated_at = NOW()
            WHERE id = ANY($2) AND is_used = false AND is_active = true
            "#,
        )
        .bind(blend_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != ids.len() as u64 {
            tx.rollback().await?;
            return Err(AppError::TransactionConflict);
        }

        tx.commit().await?;

        tracing::info!("Created blend {} with {} batches", lot_number, ids.len());

        self.get_blend(blend_id).await
    }

    /// Get a blend with its batch snapshots
    pub async fn get_blend(&self, blend_id: Uuid) -> AppResult<Blend> {
        let row = sqlx::query_as::<_, BlendRow>(&format!(
            "SELECT {} FROM blends WHERE id = $1",
            BLEND_COLUMNS
        ))
        .bind(blend_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Blend".to_string()))?;

        let selected_batches = self.load_blend_batches(&[blend_id]).await?;
        row.into_blend(
            selected_batches
                .into_iter()
                .map(|(_, batch)| batch)
                .collect(),
        )
    }

    /// Paginated blend listing, newest first
    pub async fn list_blends(
        &self,
        fiscal_year: Option<String>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Blend>> {
        let total_items: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blends WHERE ($1::text IS NULL OR fiscal_year = $1)",
        )
        .bind(&fiscal_year)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, BlendRow>(&format!(
            r#"
            SELECT {}
            FROM blends
            WHERE ($1::text IS NULL OR fiscal_year = $1)
            ORDER BY fiscal_year DESC, serial_number DESC
            LIMIT $2 OFFSET $3
            "#,
            BLEND_COLUMNS
        ))
        .bind(&fiscal_year)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut batches_by_blend: HashMap<Uuid, Vec<SelectedBatch>> = HashMap::new();
        for (blend_id, batch) in self.load_blend_batches(&ids).await? {
            batches_by_blend.entry(blend_id).or_default().push(batch);
        }

        let data = rows
            .into_iter()
            .map(|row| {
                let selected = batches_by_blend.remove(&row.id).unwrap_or_default();
                row.into_blend(selected)
            })
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

    /// Every blend of a fiscal year (or all years), newest first, for export
    pub async fn list_all(&self, fiscal_year: Option<String>) -> AppResult<Vec<Blend>> {
        let rows = sqlx::query_as::<_, BlendRow>(&format!(
            r#"
            SELECT {}
            FROM blends
            WHERE ($1::text IS NULL OR fiscal_year = $1)
            ORDER BY fiscal_year DESC, serial_number DESC
            "#,
            BLEND_COLUMNS
        ))
        .bind(&fiscal_year)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut batches_by_blend: HashMap<Uuid, Vec<SelectedBatch>> = HashMap::new();
        for (blend_id, batch) in self.load_blend_batches(&ids).await? {
            batches_by_blend.entry(blend_id).or_default().push(batch);
        }

        rows.into_iter()
            .map(|row| {
                let selected = batches_by_blend.remove(&row.id).unwrap_or_default();
                row.into_blend(selected)
            })
            .collect()
    }

    /// Delete a blend and release its source batches
    pub async fn delete_blend(&self, blend_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM blends WHERE id = $1")
            .bind(blend_id)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_none() {
            return Err(AppError::NotFound("Blend".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE batches
            SET is_used = false, used_in_blend = NULL, updated_at = NOW()
            WHERE used_in_blend = $1
            "#,
        )
        .bind(blend_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM blend_batches WHERE blend_id = $1")
            .bind(blend_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM blends WHERE id = $1")
            .bind(blend_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Deleted blend {} and released its batches", blend_id);

        Ok(())
    }

    /// Batch snapshots for a set of blends, in sheet order
    async fn load_blend_batches(
        &self,
        blend_ids: &[Uuid],
    ) -> AppResult<Vec<(Uuid, SelectedBatch)>> {
        if blend_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BlendBatchRow>(
            r#"
            SELECT blend_id, batch_id, batch_number, bloom, bags, is_outsource
            FROM blend_batches
            WHERE blend_id = ANY($1)
            ORDER BY blend_id, position
            "#,
        )
        .bind(blend_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.blend_id,
                    SelectedBatch {
                        batch_id: r.batch_id,
                        batch_number: r.batch_number,
                        bloom: r.bloom,
                        bags: r.bags,
                        is_outsource: r.is_outsource,
                    },
                )
            })
            .collect())
    }
}
