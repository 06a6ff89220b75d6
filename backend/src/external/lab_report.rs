//! Lab Report Extraction Client
//!
//! Client for the hosted document extraction microservice. It receives a
//! scanned lab report (PDF or image) and returns the tabular batch rows it
//! recognised. Row-level validation happens afterwards in the import service.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::models::ExtractedReportRow;

use crate::error::{AppError, AppResult};

/// Client for the lab report extraction microservice
#[derive(Clone)]
pub struct LabReportExtractionClient {
    api_endpoint: String,
    api_key: String,
    http_client: Client,
}

/// Request to extract batch rows from a scanned report
#[derive(Debug, Serialize)]
pub struct ExtractReportRequest {
    pub document_base64: String,
    /// "pdf", "png" or "jpeg"
    pub document_type: String,
}

/// Response from the extraction API
#[derive(Debug, Deserialize)]
pub struct ExtractReportResponse {
    pub request_id: String,
    pub rows: Vec<ExtractedReportRow>,
    pub confidence_score: f32,
    pub processing_time_ms: i32,
}

impl LabReportExtractionClient {
    /// Create a new extraction client
    pub fn new(api_endpoint: String, api_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_endpoint,
            api_key,
            http_client,
        }
    }

    /// Create a client from the extraction section of the configuration
    pub fn from_config(config: &crate::config::ExtractionConfig) -> Self {
        Self::new(config.api_endpoint.clone(), config.api_key.clone())
    }

    /// Send a scanned report for extraction
    pub async fn extract_rows(
        &self,
        request: ExtractReportRequest,
    ) -> AppResult<ExtractReportResponse> {
        let response = self
            .http_client
            .post(&self.api_endpoint)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExtractionError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExtractionError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: ExtractReportResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExtractionError(format!("Failed to parse response: {}", e)))?;

        Ok(result)
    }
}
