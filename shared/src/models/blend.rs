//! Blend planning: target validation, batch selection and aggregation
//!
//! A blend mixes available batches so the combined gel strength lands inside
//! a target bloom range. Planning is pure; the backend commits a validated
//! plan and the source batches in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::batch::{Batch, NumericAttribute};

/// Weight of one bag of gelatin, in kilograms
pub const BAG_WEIGHT_KG: u32 = 25;

/// How batches are matched against the bloom target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BloomSelectionMode {
    /// Individual blooms may fall outside the range as long as the
    /// bags-weighted average lands inside it
    #[default]
    AverageToMean,
    /// Every selected batch's bloom must itself lie inside the range
    AnyInRange,
}

impl BloomSelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloomSelectionMode::AverageToMean => "average_to_mean",
            BloomSelectionMode::AnyInRange => "any_in_range",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "average_to_mean" => Some(BloomSelectionMode::AverageToMean),
            "any_in_range" => Some(BloomSelectionMode::AnyInRange),
            _ => None,
        }
    }
}

/// Quality specification a blend must meet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendTarget {
    pub bloom_min: Decimal,
    pub bloom_max: Decimal,
    /// Optional centre of the range to steer selection towards
    pub mean_bloom: Option<Decimal>,
    pub mesh: Option<Decimal>,
    #[serde(default)]
    pub selection_mode: BloomSelectionMode,
}

/// One caller-supplied selection entry: which batch, how many bags.
///
/// Both the manual UI path and [`suggest_selection`] produce this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSelection {
    pub batch_id: Uuid,
    pub bags: i32,
}

/// Snapshot of a batch taken at blend-creation time, so the printed sheet
/// stays stable even if the source record later changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectedBatch {
    pub batch_id: Uuid,
    pub batch_number: i32,
    pub bloom: Decimal,
    pub bags: i32,
    pub is_outsource: bool,
}

impl SelectedBatch {
    /// Batch number with the outsource marker, as printed on sheets
    pub fn label(&self) -> String {
        if self.is_outsource {
            format!("{} (OS)", self.batch_number)
        } else {
            self.batch_number.to_string()
        }
    }
}

/// Bags-weighted average of one optional quality attribute, computed over the
/// selected batches that carry the attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeAverage {
    pub attribute: NumericAttribute,
    pub value: Decimal,
}

/// Validated, fully aggregated selection ready to be committed
#[derive(Debug, Clone, Serialize)]
pub struct BlendPlan {
    pub selected: Vec<SelectedBatch>,
    pub total_bags: i32,
    pub total_weight_kg: Decimal,
    pub average_bloom: Decimal,
    /// Averages of the non-bloom attributes present on at least one batch
    pub attribute_averages: Vec<AttributeAverage>,
}

/// A confirmed blend record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blend {
    pub id: Uuid,
    pub fiscal_year: String,
    /// External identifier, unique per fiscal year (e.g. "GLT-2025-26-0042")
    pub lot_number: String,
    /// Sequential serial behind the lot number, unique per fiscal year
    pub serial_number: i32,
    pub target: BlendTarget,
    pub selected_batches: Vec<SelectedBatch>,
    pub total_bags: i32,
    pub total_weight_kg: Decimal,
    pub average_bloom: Decimal,
    pub attribute_averages: Vec<AttributeAverage>,
    pub created_at: DateTime<Utc>,
}

/// Planning and selection failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BlendError {
    #[error("Invalid bloom range: min {min} exceeds max {max}")]
    InvalidRange { min: Decimal, max: Decimal },

    #[error("Target mean bloom {mean} lies outside the range [{min}, {max}]")]
    MeanOutsideRange {
        mean: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("A blend needs at least one batch")]
    EmptySelection,

    #[error("Invalid bag count {bags} for batch {batch_number}")]
    InvalidQuantity { batch_number: i32, bags: i32 },

    #[error("Batch {batch_number} is not available")]
    BatchUnavailable { batch_number: i32 },

    #[error("Batch {batch_number} has no bloom measurement")]
    MissingBloom { batch_number: i32 },

    #[error("Bloom {bloom} of batch {batch_number} is outside the range [{min}, {max}]")]
    BloomOutOfRange {
        batch_number: i32,
        bloom: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Selection averages {average} bloom, outside the range [{min}, {max}]")]
    TargetNotMet {
        average: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Only {available_bags} bags available towards {required_bags} required")]
    InsufficientStock {
        available_bags: i32,
        required_bags: i32,
    },
}

/// Validate the target range itself, independent of any selection
pub fn validate_target(target: &BlendTarget) -> Result<(), BlendError> {
    if target.bloom_min > target.bloom_max {
        return Err(BlendError::InvalidRange {
            min: target.bloom_min,
            max: target.bloom_max,
        });
    }
    if let Some(mean) = target.mean_bloom {
        if mean < target.bloom_min || mean > target.bloom_max {
            return Err(BlendError::MeanOutsideRange {
                mean,
                min: target.bloom_min,
                max: target.bloom_max,
            });
        }
    }
    Ok(())
}

/// Validate a selection against a target and compute its aggregates.
///
/// Aggregation rule: `average_bloom` and every other averaged attribute are
/// **weighted by bags**. Non-bloom attributes are averaged over the batches
/// that carry them and reported only when at least one batch does.
///
/// No side effects; the caller commits the returned plan atomically with the
/// `is_used` flips.
pub fn plan_blend(
    target: &BlendTarget,
    selection: &[(&Batch, i32)],
) -> Result<BlendPlan, BlendError> {
    validate_target(target)?;

    if selection.is_empty() {
        return Err(BlendError::EmptySelection);
    }

    let mut selected = Vec::with_capacity(selection.len());
    let mut total_bags: i32 = 0;
    let mut bloom_weighted = Decimal::ZERO;

    for (batch, bags) in selection {
        if *bags <= 0 {
            return Err(BlendError::InvalidQuantity {
                batch_number: batch.batch_number,
                bags: *bags,
            });
        }
        if !batch.is_available() {
            return Err(BlendError::BatchUnavailable {
                batch_number: batch.batch_number,
            });
        }
        let bloom = batch
            .quality
            .bloom
            .ok_or(BlendError::MissingBloom {
                batch_number: batch.batch_number,
            })?;
        if target.selection_mode == BloomSelectionMode::AnyInRange
            && (bloom < target.bloom_min || bloom > target.bloom_max)
        {
            return Err(BlendError::BloomOutOfRange {
                batch_number: batch.batch_number,
                bloom,
                min: target.bloom_min,
                max: target.bloom_max,
            });
        }

        total_bags = total_bags
            .checked_add(*bags)
            .ok_or(BlendError::InvalidQuantity {
                batch_number: batch.batch_number,
                bags: *bags,
            })?;
        bloom_weighted += bloom * Decimal::from(*bags);
        selected.push(SelectedBatch {
            batch_id: batch.id,
            batch_number: batch.batch_number,
            bloom,
            bags: *bags,
            is_outsource: batch.batch_type.is_outsource(),
        });
    }

    let average_bloom = bloom_weighted / Decimal::from(total_bags);
    if average_bloom < target.bloom_min || average_bloom > target.bloom_max {
        return Err(BlendError::TargetNotMet {
            average: average_bloom,
            min: target.bloom_min,
            max: target.bloom_max,
        });
    }

    let mut attribute_averages = Vec::new();
    for attribute in NumericAttribute::ALL {
        if attribute == NumericAttribute::Bloom {
            continue;
        }
        let mut weighted = Decimal::ZERO;
        let mut bags_with_value: i32 = 0;
        for (batch, bags) in selection {
            if let Some(value) = batch.quality.numeric(attribute) {
                weighted += value * Decimal::from(*bags);
                bags_with_value += bags;
            }
        }
        if bags_with_value > 0 {
            attribute_averages.push(AttributeAverage {
                attribute,
                value: weighted / Decimal::from(bags_with_value),
            });
        }
    }

    Ok(BlendPlan {
        selected,
        total_bags,
        total_weight_kg: Decimal::from(total_bags) * Decimal::from(BAG_WEIGHT_KG),
        average_bloom,
        attribute_averages,
    })
}

/// Automatic selection: pick available batches towards `required_bags` so the
/// result satisfies the target. Produces the same `{batch, bags}` contract the
/// manual path uses; the caller still commits through [`plan_blend`].
///
/// Greedy single pass. `any_in_range` walks candidates in batch-number order
/// and takes whole batches whose bloom is in range; `average_to_mean` sorts by
/// distance to the target centre and admits a batch only while the running
/// weighted average stays inside the range.
pub fn suggest_selection(
    target: &BlendTarget,
    available: &[Batch],
    required_bags: i32,
) -> Result<Vec<BatchSelection>, BlendError> {
    validate_target(target)?;
    if required_bags <= 0 {
        return Err(BlendError::InvalidQuantity {
            batch_number: 0,
            bags: required_bags,
        });
    }

    let mut candidates: Vec<(Decimal, &Batch)> = available
        .iter()
        .filter(|b| b.is_available() && b.bags > 0)
        .filter_map(|b| b.quality.bloom.map(|bloom| (bloom, b)))
        .collect();

    let mut picked: Vec<BatchSelection> = Vec::new();
    let mut total_bags: i32 = 0;
    let mut bloom_weighted = Decimal::ZERO;

    match target.selection_mode {
        BloomSelectionMode::AnyInRange => {
            candidates.sort_by_key(|(_, b)| b.batch_number);
            for (bloom, batch) in candidates {
                if bloom < target.bloom_min || bloom > target.bloom_max {
                    continue;
                }
                picked.push(BatchSelection {
                    batch_id: batch.id,
                    bags: batch.bags,
                });
                total_bags += batch.bags;
                if total_bags >= required_bags {
                    return Ok(picked);
                }
            }
        }
        BloomSelectionMode::AverageToMean => {
            let centre = target
                .mean_bloom
                .unwrap_or((target.bloom_min + target.bloom_max) / Decimal::from(2));
            candidates.sort_by(|(bloom_a, a), (bloom_b, b)| {
                let da = (*bloom_a - centre).abs();
                let db = (*bloom_b - centre).abs();
                da.cmp(&db).then(a.batch_number.cmp(&b.batch_number))
            });
            for (bloom, batch) in candidates {
                let next_weighted = bloom_weighted + bloom * Decimal::from(batch.bags);
                let next_bags = total_bags + batch.bags;
                let next_average = next_weighted / Decimal::from(next_bags);
                if next_average < target.bloom_min || next_average > target.bloom_max {
                    continue;
                }
                picked.push(BatchSelection {
                    batch_id: batch.id,
                    bags: batch.bags,
                });
                bloom_weighted = next_weighted;
                total_bags = next_bags;
                if total_bags >= required_bags {
                    return Ok(picked);
                }
            }
        }
    }

    Err(BlendError::InsufficientStock {
        available_bags: total_bags,
        required_bags,
    })
}
