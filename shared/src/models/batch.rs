//! Production and outsourced batch models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Origin of a batch: made in-house or bought from a third party
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchType {
    Production,
    Outsource,
}

impl BatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchType::Production => "production",
            BatchType::Outsource => "outsource",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "production" => Some(BatchType::Production),
            "outsource" => Some(BatchType::Outsource),
            _ => None,
        }
    }

    pub fn is_outsource(&self) -> bool {
        matches!(self, BatchType::Outsource)
    }
}

impl std::fmt::Display for BatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchType::Production => write!(f, "Production"),
            BatchType::Outsource => write!(f, "Outsource"),
        }
    }
}

/// Lab measurements recorded against a batch.
///
/// Every field is optional: a batch may arrive with any subset populated
/// (manual entry or report extraction). Kept as explicit typed fields rather
/// than an open map so aggregation and rendering stay exhaustive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityAttributes {
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

/// Numeric quality attributes that can be averaged across a blend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NumericAttribute {
    Bloom,
    Viscosity,
    Percentage,
    Ph,
    Conductivity,
    Moisture,
    H2o2,
    So2,
    Mesh,
}

impl NumericAttribute {
    /// All averageable attributes, in rendering order
    pub const ALL: [NumericAttribute; 9] = [
        NumericAttribute::Bloom,
        NumericAttribute::Viscosity,
        NumericAttribute::Percentage,
        NumericAttribute::Ph,
        NumericAttribute::Conductivity,
        NumericAttribute::Moisture,
        NumericAttribute::H2o2,
        NumericAttribute::So2,
        NumericAttribute::Mesh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericAttribute::Bloom => "bloom",
            NumericAttribute::Viscosity => "viscosity",
            NumericAttribute::Percentage => "percentage",
            NumericAttribute::Ph => "ph",
            NumericAttribute::Conductivity => "conductivity",
            NumericAttribute::Moisture => "moisture",
            NumericAttribute::H2o2 => "h2o2",
            NumericAttribute::So2 => "so2",
            NumericAttribute::Mesh => "mesh",
        }
    }
}

impl std::fmt::Display for NumericAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl QualityAttributes {
    /// Look up a numeric attribute by tag
    pub fn numeric(&self, attribute: NumericAttribute) -> Option<Decimal> {
        match attribute {
            NumericAttribute::Bloom => self.bloom,
            NumericAttribute::Viscosity => self.viscosity,
            NumericAttribute::Percentage => self.percentage,
            NumericAttribute::Ph => self.ph,
            NumericAttribute::Conductivity => self.conductivity,
            NumericAttribute::Moisture => self.moisture,
            NumericAttribute::H2o2 => self.h2o2,
            NumericAttribute::So2 => self.so2,
            NumericAttribute::Mesh => self.mesh,
        }
    }

    /// True when no measurement at all has been recorded
    pub fn is_empty(&self) -> bool {
        NumericAttribute::ALL.iter().all(|a| self.numeric(*a).is_none())
            && self.color.is_none()
            && self.clarity.is_none()
            && self.odour.is_none()
    }
}

/// A production or outsourced gelatin batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    /// Fiscal-year token the batch number is scoped to (e.g. "2025-26")
    pub fiscal_year: String,
    pub batch_type: BatchType,
    /// Sequential number, unique within (fiscal_year, batch_type)
    pub batch_number: i32,
    /// Bags on hand; one bag weighs [`crate::models::blend::BAG_WEIGHT_KG`] kg
    pub bags: i32,
    pub quality: QualityAttributes,
    pub is_used: bool,
    /// Blend that consumed this batch; set and cleared together with `is_used`
    pub used_in_blend: Option<Uuid>,
    /// False once the batch's fiscal year has been archived
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Available for selection into a blend
    pub fn is_available(&self) -> bool {
        !self.is_used && self.is_active
    }

    /// Batch number with the outsource marker, as printed on sheets
    pub fn label(&self) -> String {
        if self.batch_type.is_outsource() {
            format!("{} (OS)", self.batch_number)
        } else {
            self.batch_number.to_string()
        }
    }
}
