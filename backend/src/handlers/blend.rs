//! Blend HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::Pagination;

use crate::middleware::CurrentUser;
use crate::services::blend::{BlendService, CreateBlendInput, SuggestBlendInput};
use crate::services::{AuditService, DocumentService};
use crate::AppState;

/// Query parameters for blend listings
#[derive(Debug, Deserialize)]
pub struct ListBlendsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub fiscal_year: Option<String>,
}

/// List blends, newest first
pub async fn list_blends(
    State(state): State<AppState>,
    Query(query): Query<ListBlendsQuery>,
) -> impl IntoResponse {
    let default = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(default.page).max(1),
        per_page: query.per_page.unwrap_or(default.per_page).clamp(1, 200),
    };
    let service = BlendService::new(state.db.clone());

    match service.list_blends(query.fiscal_year, pagination).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a blend with its batch snapshots
pub async fn get_blend(
    State(state): State<AppState>,
    Path(blend_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    match service.get_blend(blend_id).await {
        Ok(blend) => (StatusCode::OK, Json(blend)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Validate a selection and return its aggregates without committing
pub async fn preview_blend(
    State(state): State<AppState>,
    Json(input): Json<CreateBlendInput>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    match service.preview_blend(input).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Automatically pick batches towards the required quantity
pub async fn suggest_blend(
    State(state): State<AppState>,
    Json(input): Json<SuggestBlendInput>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    match service.suggest_blend(input).await {
        Ok(suggestion) => (StatusCode::OK, Json(suggestion)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Commit a blend
pub async fn create_blend(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBlendInput>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    match service.create_blend(input).await {
        Ok(blend) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "create",
                "blend",
                blend.id,
                serde_json::json!({
                    "lot_number": blend.lot_number,
                    "total_bags": blend.total_bags,
                    "average_bloom": blend.average_bloom,
                }),
            );
            (StatusCode::CREATED, Json(blend)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Delete a blend and release its source batches
pub async fn delete_blend(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(blend_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    match service.delete_blend(blend_id).await {
        Ok(()) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "delete",
                "blend",
                blend_id,
                serde_json::json!({}),
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Query parameters for the blend export
#[derive(Debug, Deserialize)]
pub struct ExportBlendsQuery {
    pub fiscal_year: Option<String>,
}

/// Export the blend register as CSV
pub async fn export_blends_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportBlendsQuery>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    let blends = match service.list_all(query.fiscal_year).await {
        Ok(blends) => blends,
        Err(e) => return e.into_response(),
    };

    // Flatten for the spreadsheet: one row per blend
    #[derive(serde::Serialize)]
    struct BlendCsvRow {
        fiscal_year: String,
        lot_number: String,
        serial_number: i32,
        bloom_min: rust_decimal::Decimal,
        bloom_max: rust_decimal::Decimal,
        batches: usize,
        total_bags: i32,
        total_weight_kg: rust_decimal::Decimal,
        average_bloom: rust_decimal::Decimal,
        created_at: String,
    }

    let rows: Vec<BlendCsvRow> = blends
        .iter()
        .map(|b| BlendCsvRow {
            fiscal_year: b.fiscal_year.clone(),
            lot_number: b.lot_number.clone(),
            serial_number: b.serial_number,
            bloom_min: b.target.bloom_min,
            bloom_max: b.target.bloom_max,
            batches: b.selected_batches.len(),
            total_bags: b.total_bags,
            total_weight_kg: b.total_weight_kg,
            average_bloom: b.average_bloom,
            created_at: b.created_at.to_rfc3339(),
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
                    "attachment; filename=\"blends.csv\"".to_string(),
                ),
            ],
            csv_data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Blend sheet as plain text
pub async fn get_blend_sheet_text(
    State(state): State<AppState>,
    Path(blend_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    let blend = match service.get_blend(blend_id).await {
        Ok(blend) => blend,
        Err(e) => return e.into_response(),
    };

    let documents = DocumentService::new(state.config.clone());
    let text = documents.sheet_text(&blend);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response()
}

/// Blend sheet body as CSV
pub async fn get_blend_sheet_csv(
    State(state): State<AppState>,
    Path(blend_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    let blend = match service.get_blend(blend_id).await {
        Ok(blend) => blend,
        Err(e) => return e.into_response(),
    };

    let documents = DocumentService::new(state.config.clone());
    match documents.sheet_csv(&blend) {
        Ok(csv_data) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.csv\"", blend.lot_number),
                ),
            ],
            csv_data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Blend sheet as a printable PDF
pub async fn get_blend_sheet_pdf(
    State(state): State<AppState>,
    Path(blend_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BlendService::new(state.db.clone());

    let blend = match service.get_blend(blend_id).await {
        Ok(blend) => blend,
        Err(e) => return e.into_response(),
    };

    let documents = DocumentService::new(state.config.clone());
    match documents.sheet_pdf(&blend) {
        Ok(pdf_data) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.pdf\"", blend.lot_number),
                ),
            ],
            pdf_data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
