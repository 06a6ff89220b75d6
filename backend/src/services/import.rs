//! Lab-report import service
//!
//! Bridges the extraction client and the batch registry. Imports are
//! row-tolerant: each extracted row is validated and inserted on its own, and
//! a bad row is reported, not fatal. Only a report with zero usable rows
//! fails the request.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;

use shared::models::{
    validate_extracted_row, BatchType, ExtractedReportRow, ImportSummary, SkippedRow,
};
use shared::validation::validate_fiscal_year_token;

use crate::error::{AppError, AppResult};
use crate::external::lab_report::{ExtractReportRequest, LabReportExtractionClient};
use crate::services::fiscal_year::{
    assert_fiscal_year_open, claim_counter_value, counter_kind_for,
};

/// Import service
#[derive(Clone)]
pub struct ImportService {
    db: PgPool,
    client: LabReportExtractionClient,
}

/// Input for importing a scanned lab report
#[derive(Debug, Deserialize)]
pub struct ImportReportInput {
    pub document_base64: String,
    /// "pdf", "png" or "jpeg"
    pub document_type: String,
    /// Defaults to the current fiscal year when omitted
    pub fiscal_year: Option<String>,
    pub batch_type: BatchType,
}

/// Input for importing rows the operator already reviewed client-side
#[derive(Debug, Deserialize)]
pub struct ImportRowsInput {
    pub fiscal_year: Option<String>,
    pub batch_type: BatchType,
    pub rows: Vec<ExtractedReportRow>,
}

impl ImportService {
    /// Create a new ImportService instance
    pub fn new(db: PgPool, client: LabReportExtractionClient) -> Self {
        Self { db, client }
    }

    /// Send a scanned report through extraction, then import the rows
    pub async fn import_report(&self, input: ImportReportInput) -> AppResult<ImportSummary> {
        // Catch corrupt uploads before the round-trip to the extraction service
        if BASE64.decode(&input.document_base64).is_err() {
            return Err(AppError::Validation {
                field: "document_base64".to_string(),
                message: "Document payload is not valid base64".to_string(),
            });
        }

        let response = self
            .client
            .extract_rows(ExtractReportRequest {
                document_base64: input.document_base64,
                document_type: input.document_type,
            })
            .await?;

        tracing::info!(
            "Extraction returned {} rows (confidence {:.2})",
            response.rows.len(),
            response.confidence_score
        );

        self.import_rows(ImportRowsInput {
            fiscal_year: input.fiscal_year,
            batch_type: input.batch_type,
            rows: response.rows,
        })
        .await
    }

    /// Import extracted rows, skipping the ones that fail validation
    pub async fn import_rows(&self, input: ImportRowsInput) -> AppResult<ImportSummary> {
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

        if input.rows.is_empty() {
            return Err(AppError::Validation {
                field: "rows".to_string(),
                message: "The report contained no rows".to_string(),
            });
        }

        {
            let mut conn = self.db.acquire().await?;
            assert_fiscal_year_open(&mut *conn, &fiscal_year).await?;
        }

        let mut imported = 0usize;
        let mut skipped: Vec<SkippedRow> = Vec::new();
        let mut max_number: Option<i32> = None;

        for (index, row) in input.rows.iter().enumerate() {
            let fields = match validate_extracted_row(row) {
                Ok(fields) => fields,
                Err(reason) => {
                    skipped.push(SkippedRow {
                        row: index + 1,
                        reason,
                    });
                    continue;
                }
            };

            // Each row inserts on its own so one duplicate does not poison
            // the rest of the report
            let q = &fields.quality;
            let result = sqlx::query(
                r#"
                INSERT INTO batches
                    (fiscal_year, batch_type, batch_number, bags,
                     bloom, viscosity, percentage, ph, conductivity, moisture, h2o2, so2, mesh,
                     color, clarity, odour)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                "#,
            )
            .bind(&fiscal_year)
            .bind(input.batch_type.as_str())
            .bind(fields.batch_number)
            .bind(fields.bags)
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
            .execute(&self.db)
            .await;

            match result.map_err(AppError::from) {
                Ok(_) => {
                    imported += 1;
                    max_number = Some(max_number.map_or(fields.batch_number, |m| {
                        m.max(fields.batch_number)
                    }));
                }
                Err(AppError::DuplicateEntry(_)) => {
                    skipped.push(SkippedRow {
                        row: index + 1,
                        reason: format!(
                            "Batch number {} already exists in fiscal year {}",
                            fields.batch_number, fiscal_year
                        ),
                    });
                }
                Err(other) => return Err(other),
            }
        }

        if imported == 0 {
            return Err(AppError::PartialImportFailure { skipped });
        }

        // Pull the counter past the highest imported number
        if let Some(number) = max_number {
            let mut conn = self.db.acquire().await?;
            claim_counter_value(
                &mut *conn,
                &fiscal_year,
                counter_kind_for(input.batch_type),
                number,
            )
            .await?;
        }

        tracing::info!(
            "Imported {} of {} extracted rows into {}",
            imported,
            input.rows.len(),
            fiscal_year
        );

        Ok(ImportSummary { imported, skipped })
    }
}
