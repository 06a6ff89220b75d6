//! Lab report import HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::external::LabReportExtractionClient;
use crate::services::import::{ImportReportInput, ImportRowsInput, ImportService};
use crate::AppState;

/// Send a scanned report through extraction and import the rows
pub async fn import_report(
    State(state): State<AppState>,
    Json(input): Json<ImportReportInput>,
) -> impl IntoResponse {
    let client = LabReportExtractionClient::from_config(&state.config.extraction);
    let service = ImportService::new(state.db.clone(), client);

    match service.import_report(input).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Import rows the operator already reviewed client-side
pub async fn import_rows(
    State(state): State<AppState>,
    Json(input): Json<ImportRowsInput>,
) -> impl IntoResponse {
    let client = LabReportExtractionClient::from_config(&state.config.extraction);
    let service = ImportService::new(state.db.clone(), client);

    match service.import_rows(input).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}
