//! Lab-report extraction rows and tolerant import validation
//!
//! The extraction service reads a scanned lab report and returns best-effort
//! rows; any field may be missing. Each row either becomes a valid batch or
//! is skipped with a reason the UI can display ("N skipped, showing reasons").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::batch::QualityAttributes;

/// One best-effort row extracted from a scanned report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedReportRow {
    pub batch_number: Option<i32>,
    pub bags: Option<i32>,
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
}

/// A row the import refused, and why
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based row position in the extracted report
    pub row: usize,
    pub reason: String,
}

/// Outcome of importing one extracted report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Fields of a batch the import is ready to insert
#[derive(Debug, Clone)]
pub struct NewBatchFields {
    pub batch_number: i32,
    pub bags: i32,
    pub quality: QualityAttributes,
}

/// Check one extracted row.
///
/// A batch number is the only hard requirement; bags default to zero when the
/// report column could not be read. Out-of-range measurements are refused
/// rather than silently stored.
pub fn validate_extracted_row(row: &ExtractedReportRow) -> Result<NewBatchFields, String> {
    let batch_number = row
        .batch_number
        .ok_or_else(|| "Missing batch number".to_string())?;
    if batch_number <= 0 {
        return Err(format!("Batch number {} is not positive", batch_number));
    }

    let bags = row.bags.unwrap_or(0);
    if bags < 0 {
        return Err(format!("Bag count {} is negative", bags));
    }

    if let Some(bloom) = row.bloom {
        if bloom <= Decimal::ZERO {
            return Err(format!("Bloom {} is not positive", bloom));
        }
    }
    if let Some(ph) = row.ph {
        if ph < Decimal::ZERO || ph > Decimal::from(14) {
            return Err(format!("pH {} is outside 0-14", ph));
        }
    }
    if let Some(moisture) = row.moisture {
        if moisture < Decimal::ZERO || moisture > Decimal::from(100) {
            return Err(format!("Moisture {}% is outside 0-100", moisture));
        }
    }
    if let Some(percentage) = row.percentage {
        if percentage < Decimal::ZERO || percentage > Decimal::from(100) {
            return Err(format!("Percentage {}% is outside 0-100", percentage));
        }
    }

    Ok(NewBatchFields {
        batch_number,
        bags,
        quality: QualityAttributes {
            bloom: row.bloom,
            viscosity: row.viscosity,
            percentage: row.percentage,
            ph: row.ph,
            conductivity: row.conductivity,
            moisture: row.moisture,
            h2o2: row.h2o2,
            so2: row.so2,
            mesh: row.mesh,
            color: row.color.clone(),
            clarity: row.clarity.clone(),
            odour: row.odour.clone(),
        },
    })
}
