//! Fiscal year HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::fiscal_year::{ArchiveInput, FiscalYearService};
use crate::services::AuditService;
use crate::AppState;

/// Current fiscal year token
pub async fn get_current_fiscal_year(State(state): State<AppState>) -> impl IntoResponse {
    let service = FiscalYearService::new(state.db.clone());

    (
        StatusCode::OK,
        Json(serde_json::json!({ "fiscal_year": service.current_fiscal_year() })),
    )
}

/// Numbering counters for a fiscal year
pub async fn list_counters(
    State(state): State<AppState>,
    Path(fiscal_year): Path<String>,
) -> impl IntoResponse {
    let service = FiscalYearService::new(state.db.clone());

    match service.list_counters(&fiscal_year).await {
        Ok(counters) => (
            StatusCode::OK,
            Json(serde_json::json!({ "counters": counters })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Close a fiscal year and seed the next one
pub async fn archive_fiscal_year(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ArchiveInput>,
) -> impl IntoResponse {
    let service = FiscalYearService::new(state.db.clone());

    match service.archive_fiscal_year(&input.fiscal_year).await {
        Ok(summary) => {
            AuditService::new(state.db.clone()).record(
                Some(current_user.0.user_id),
                "archive",
                "fiscal_year",
                Uuid::nil(),
                serde_json::json!({
                    "old_fiscal_year": summary.old_fiscal_year,
                    "new_fiscal_year": summary.new_fiscal_year,
                }),
            );
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Archive records for a closed fiscal year
pub async fn list_archives(
    State(state): State<AppState>,
    Path(fiscal_year): Path<String>,
) -> impl IntoResponse {
    let service = FiscalYearService::new(state.db.clone());

    match service.list_archives(&fiscal_year).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({ "archives": entries })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
