//! Error handling for the Gelatin Production Management Platform
//!
//! Every validation failure carries enough context (offending field or batch)
//! for the UI to display a precise message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use shared::models::{BlendError, SkippedRow};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid bloom range: min {min} exceeds max {max}")]
    InvalidRange { min: Decimal, max: Decimal },

    #[error("Invalid bag count {bags} for batch {batch_number}")]
    InvalidQuantity { batch_number: i32, bags: i32 },

    // Blend commit errors
    #[error("Batch {batch_number} is not available")]
    BatchUnavailable { batch_number: i32 },

    #[error("Selection rejected: {0}")]
    BlendRejected(String),

    // Registry errors
    #[error("Batch {batch_id} is already used")]
    AlreadyUsed { batch_id: Uuid },

    #[error("Batch number {batch_number} already exists in fiscal year {fiscal_year}")]
    DuplicateBatchNumber {
        batch_number: i32,
        fiscal_year: String,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Concurrency
    #[error("Write conflict, please retry")]
    TransactionConflict,

    // Import
    #[error("No rows could be imported from the report")]
    PartialImportFailure { skipped: Vec<SkippedRow> },

    // External service errors
    #[error("Extraction service error: {0}")]
    ExtractionError(String),

    #[error("Document rendering failed: {0}")]
    DocumentRender(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Classify driver errors into domain variants instead of a blanket wrap:
/// serialization failures are retryable, unique violations are conflicts.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return AppError::NotFound("Record".to_string());
        }
        if let Some(db) = err.as_database_error() {
            match db.code().as_deref() {
                Some("40001") | Some("40P01") => return AppError::TransactionConflict,
                Some("23505") => {
                    return AppError::DuplicateEntry(
                        db.constraint().unwrap_or("unique constraint").to_string(),
                    )
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

/// Map pure planning failures onto the API error kinds
impl From<BlendError> for AppError {
    fn from(err: BlendError) -> Self {
        match err {
            BlendError::InvalidRange { min, max } => AppError::InvalidRange { min, max },
            BlendError::MeanOutsideRange { min, max, .. } => {
                AppError::InvalidRange { min, max }
            }
            BlendError::InvalidQuantity { batch_number, bags } => {
                AppError::InvalidQuantity { batch_number, bags }
            }
            BlendError::BatchUnavailable { batch_number } => {
                AppError::BatchUnavailable { batch_number }
            }
            BlendError::EmptySelection => AppError::Validation {
                field: "selected_batches".to_string(),
                message: "A blend needs at least one batch".to_string(),
            },
            BlendError::MissingBloom { batch_number } => AppError::Validation {
                field: "selected_batches".to_string(),
                message: format!("Batch {} has no bloom measurement", batch_number),
            },
            other => AppError::BlendRejected(other.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Present (true) only for conflicts the caller should retry once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    /// Per-row skip reasons for import failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<SkippedRow>>,
}

impl ErrorDetail {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            field: None,
            retryable: None,
            skipped: None,
        }
    }

    fn with_field(mut self, field: String) -> Self {
        self.field = Some(field);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone())
                    .with_field(field.clone()),
            ),
            AppError::InvalidRange { .. } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_RANGE", self.to_string())
                    .with_field("target_bloom".to_string()),
            ),
            AppError::InvalidQuantity { batch_number, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_QUANTITY", self.to_string())
                    .with_field(format!("batch {}", batch_number)),
            ),
            AppError::BatchUnavailable { batch_number } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("BATCH_UNAVAILABLE", self.to_string())
                    .with_field(format!("batch {}", batch_number)),
            ),
            AppError::BlendRejected(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("BLEND_REJECTED", self.to_string()),
            ),
            AppError::AlreadyUsed { batch_id } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("ALREADY_USED", self.to_string())
                    .with_field(batch_id.to_string()),
            ),
            AppError::DuplicateBatchNumber { .. } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("DUPLICATE_BATCH_NUMBER", self.to_string())
                    .with_field("batch_number".to_string()),
            ),
            AppError::DuplicateEntry(entry) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", entry),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::TransactionConflict => {
                let mut detail =
                    ErrorDetail::new("TRANSACTION_CONFLICT", self.to_string());
                detail.retryable = Some(true);
                (StatusCode::CONFLICT, detail)
            }
            AppError::PartialImportFailure { skipped } => {
                let mut detail =
                    ErrorDetail::new("PARTIAL_IMPORT_FAILURE", self.to_string());
                detail.skipped = Some(skipped.clone());
                (StatusCode::UNPROCESSABLE_ENTITY, detail)
            }
            AppError::ExtractionError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "EXTRACTION_ERROR",
                    format!("Extraction service error: {}", msg),
                ),
            ),
            AppError::DocumentRender(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DOCUMENT_RENDER_ERROR",
                    format!("Document rendering failed: {}", msg),
                ),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
