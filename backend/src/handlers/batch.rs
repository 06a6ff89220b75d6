//! Batch registry HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::BatchType;
use shared::types::Pagination;

use crate::middleware::CurrentUser;
use crate::services::batch::{BatchFilter, BatchService, CreateBatchInput, UpdateBatchInput};
use crate::services::{AuditService, DocumentService};
use crate::AppState;

/// Query parameters for batch listings
#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub fiscal_year: Option<String>,
    pub batch_type: Option<BatchType>,
    pub available_only: Option<bool>,
    pub created_from: Option<chrono::NaiveDate>,
    pub created_to: Option<chrono::NaiveDate>,
}

impl ListBatchesQuery {
    fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(default.page).max(1),
            per_page: self.per_page.unwrap_or(default.per_page).clamp(1, 200),
        }
    }

    fn filter(&self) -> BatchFilter {
        BatchFilter {
            fiscal_year: self.fiscal_year.clone(),
            batch_type: self.batch_type,
            available_only: self.available_only,
            created_from: self.created_from,
            created_to: self.created_to,
        }
    }
}

/// Query parameters for the available pool and the gap report
#[derive(Debug, Deserialize)]
pub struct FiscalYearQuery {
    pub fiscal_year: String,
    pub batch_type: Option<BatchType>,
}

/// List batches with filters and pagination
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.list_batches(query.filter(), query.pagination()).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Available batches for blending, ordered by batch number
pub async fn list_available_batches(
    State(state): State<AppState>,
    Query(query): Query<FiscalYearQuery>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service
        .list_available(&query.fiscal_year, query.batch_type)
        .await
    {
        Ok(batches) => (
            StatusCode::OK,
            Json(serde_json::json!({ "batches": batches })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific batch
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.get_batch(batch_id).await {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Register a new batch
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBatchInput>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.create_batch(input).await {
        Ok(batch) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "create",
                "batch",
                batch.id,
                serde_json::json!({
                    "fiscal_year": batch.fiscal_year,
                    "batch_type": batch.batch_type,
                    "batch_number": batch.batch_number,
                }),
            );
            (StatusCode::CREATED, Json(batch)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Correct an unused batch
pub async fn update_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<UpdateBatchInput>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.update_batch(batch_id, input).await {
        Ok(batch) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "update",
                "batch",
                batch.id,
                serde_json::json!({ "bags": batch.bags }),
            );
            (StatusCode::OK, Json(batch)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Delete an unused batch
pub async fn delete_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.delete_batch(batch_id).await {
        Ok(()) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "delete",
                "batch",
                batch_id,
                serde_json::json!({}),
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Manually mark a batch as used
pub async fn mark_batch_used(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.mark_used(batch_id).await {
        Ok(batch) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "mark_used",
                "batch",
                batch.id,
                serde_json::json!({}),
            );
            (StatusCode::OK, Json(batch)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Return a manually marked batch to the available pool
pub async fn mark_batch_available(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());

    match service.mark_available(batch_id).await {
        Ok(batch) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "mark_available",
                "batch",
                batch.id,
                serde_json::json!({}),
            );
            (StatusCode::OK, Json(batch)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Missing batch numbers report
pub async fn get_gap_report(
    State(state): State<AppState>,
    Query(query): Query<FiscalYearQuery>,
) -> impl IntoResponse {
    let batch_type = query.batch_type.unwrap_or(BatchType::Production);
    let service = BatchService::new(state.db.clone());

    match service.gap_report(&query.fiscal_year, batch_type).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Export the filtered batch listing as CSV
pub async fn export_batches_csv(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> impl IntoResponse {
    let service = BatchService::new(state.db.clone());
    let pagination = Pagination {
        page: 1,
        per_page: 10_000,
    };

    let page = match service.list_batches(query.filter(), pagination).await {
        Ok(page) => page,
        Err(e) => return e.into_response(),
    };

    // Flatten for the spreadsheet: one row per batch, quality columns inline
    #[derive(serde::Serialize)]
    struct BatchCsvRow {
        fiscal_year: String,
        batch_type: &'static str,
        batch_number: i32,
        bags: i32,
        bloom: Option<rust_decimal::Decimal>,
        viscosity: Option<rust_decimal::Decimal>,
        ph: Option<rust_decimal::Decimal>,
        moisture: Option<rust_decimal::Decimal>,
        is_used: bool,
    }

    let rows: Vec<BatchCsvRow> = page
        .data
        .iter()
        .map(|b| BatchCsvRow {
            fiscal_year: b.fiscal_year.clone(),
            batch_type: b.batch_type.as_str(),
            batch_number: b.batch_number,
            bags: b.bags,
            bloom: b.quality.bloom,
            viscosity: b.quality.viscosity,
            ph: b.quality.ph,
            moisture: b.quality.moisture,
            is_used: b.is_used,
        })
        .collect();

    let documents = DocumentService::new(state.config.clone());
    match documents.export_to_csv(&rows) {
        Ok(csv_data) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"batches.csv\"".to_string(),
                ),
            ],
            csv_data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
