//! Tests for blend planning: target validation, selection checks and the
//! bags-weighted aggregation

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    plan_blend, suggest_selection, validate_target, Batch, BatchType, BlendError, BlendTarget,
    BloomSelectionMode, QualityAttributes, BAG_WEIGHT_KG,
};

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Helper to build an available production batch with a bloom measurement
fn batch(number: i32, bloom: &str, bags: i32) -> Batch {
    Batch {
        id: Uuid::new_v4(),
        fiscal_year: "2025-26".to_string(),
        batch_type: BatchType::Production,
        batch_number: number,
        bags,
        quality: QualityAttributes {
            bloom: Some(dec(bloom)),
            ..Default::default()
        },
        is_used: false,
        used_in_blend: None,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn target(min: &str, max: &str) -> BlendTarget {
    BlendTarget {
        bloom_min: dec(min),
        bloom_max: dec(max),
        mean_bloom: None,
        mesh: None,
        selection_mode: BloomSelectionMode::AverageToMean,
    }
}

// ============================================================================
// Target Validation Tests
// ============================================================================

mod target_validation {
    use super::*;

    #[test]
    fn accepts_ordinary_range() {
        assert!(validate_target(&target("190", "210")).is_ok());
    }

    #[test]
    fn accepts_degenerate_range() {
        assert!(validate_target(&target("200", "200")).is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let result = validate_target(&target("210", "190"));
        assert_eq!(
            result,
            Err(BlendError::InvalidRange {
                min: dec("210"),
                max: dec("190"),
            })
        );
    }

    #[test]
    fn rejects_mean_outside_range() {
        let mut t = target("190", "210");
        t.mean_bloom = Some(dec("250"));
        assert!(matches!(
            validate_target(&t),
            Err(BlendError::MeanOutsideRange { .. })
        ));
    }

    #[test]
    fn accepts_mean_on_range_boundary() {
        let mut t = target("190", "210");
        t.mean_bloom = Some(dec("210"));
        assert!(validate_target(&t).is_ok());
    }
}

// ============================================================================
// Selection Validation Tests
// ============================================================================

mod selection_validation {
    use super::*;

    #[test]
    fn rejects_empty_selection() {
        let result = plan_blend(&target("190", "210"), &[]);
        assert_eq!(result.unwrap_err(), BlendError::EmptySelection);
    }

    #[test]
    fn rejects_zero_bags() {
        let b = batch(1, "200", 10);
        let result = plan_blend(&target("190", "210"), &[(&b, 0)]);
        assert_eq!(
            result.unwrap_err(),
            BlendError::InvalidQuantity {
                batch_number: 1,
                bags: 0,
            }
        );
    }

    #[test]
    fn rejects_negative_bags() {
        let b = batch(1, "200", 10);
        let result = plan_blend(&target("190", "210"), &[(&b, -5)]);
        assert!(matches!(
            result.unwrap_err(),
            BlendError::InvalidQuantity { bags: -5, .. }
        ));
    }

    #[test]
    fn rejects_used_batch() {
        let mut b = batch(7, "200", 10);
        b.is_used = true;
        let result = plan_blend(&target("190", "210"), &[(&b, 10)]);
        assert_eq!(
            result.unwrap_err(),
            BlendError::BatchUnavailable { batch_number: 7 }
        );
    }

    #[test]
    fn rejects_inactive_batch() {
        // Archived fiscal year leaves batches inactive
        let mut b = batch(7, "200", 10);
        b.is_active = false;
        let result = plan_blend(&target("190", "210"), &[(&b, 10)]);
        assert_eq!(
            result.unwrap_err(),
            BlendError::BatchUnavailable { batch_number: 7 }
        );
    }

    #[test]
    fn rejects_batch_without_bloom() {
        let mut b = batch(3, "200", 10);
        b.quality.bloom = None;
        let result = plan_blend(&target("190", "210"), &[(&b, 10)]);
        assert_eq!(
            result.unwrap_err(),
            BlendError::MissingBloom { batch_number: 3 }
        );
    }

    #[test]
    fn rejects_bag_totals_past_the_integer_limit() {
        let b1 = batch(1, "200", i32::MAX);
        let b2 = batch(2, "200", i32::MAX);
        let result = plan_blend(&target("190", "210"), &[(&b1, i32::MAX), (&b2, i32::MAX)]);
        assert_eq!(
            result.unwrap_err(),
            BlendError::InvalidQuantity {
                batch_number: 2,
                bags: i32::MAX,
            }
        );
    }
}

// ============================================================================
// Aggregation Tests
// ============================================================================

mod aggregation {
    use super::*;

    #[test]
    fn equal_bags_average_is_arithmetic_mean() {
        let b1 = batch(1, "180", 10);
        let b2 = batch(2, "200", 10);
        let b3 = batch(3, "220", 10);
        let plan =
            plan_blend(&target("180", "220"), &[(&b1, 10), (&b2, 10), (&b3, 10)]).unwrap();

        assert_eq!(plan.average_bloom, dec("200"));
        assert_eq!(plan.total_bags, 30);
        assert_eq!(
            plan.total_weight_kg,
            Decimal::from(30) * Decimal::from(BAG_WEIGHT_KG)
        );
    }

    #[test]
    fn average_is_weighted_by_bags() {
        // 10 bags at 180 and 30 bags at 220: (1800 + 6600) / 40 = 210
        let b1 = batch(1, "180", 10);
        let b2 = batch(2, "220", 30);
        let plan = plan_blend(&target("200", "215"), &[(&b1, 10), (&b2, 30)]).unwrap();

        assert_eq!(plan.average_bloom, dec("210"));
    }

    #[test]
    fn selection_order_is_preserved() {
        let b1 = batch(5, "200", 10);
        let b2 = batch(2, "200", 10);
        let plan = plan_blend(&target("190", "210"), &[(&b1, 10), (&b2, 10)]).unwrap();

        let numbers: Vec<i32> = plan.selected.iter().map(|s| s.batch_number).collect();
        assert_eq!(numbers, vec![5, 2]);
    }

    #[test]
    fn rejects_average_outside_range() {
        let b1 = batch(1, "180", 10);
        let b2 = batch(2, "185", 10);
        let result = plan_blend(&target("200", "220"), &[(&b1, 10), (&b2, 10)]);
        assert!(matches!(
            result.unwrap_err(),
            BlendError::TargetNotMet { .. }
        ));
    }

    #[test]
    fn average_to_mean_allows_individual_blooms_outside_range() {
        // 170 and 230 average to 200, inside [195, 205]
        let b1 = batch(1, "170", 10);
        let b2 = batch(2, "230", 10);
        let plan = plan_blend(&target("195", "205"), &[(&b1, 10), (&b2, 10)]).unwrap();
        assert_eq!(plan.average_bloom, dec("200"));
    }

    #[test]
    fn any_in_range_rejects_bloom_outside_range() {
        let b1 = batch(1, "170", 10);
        let b2 = batch(2, "230", 10);
        let mut t = target("195", "205");
        t.selection_mode = BloomSelectionMode::AnyInRange;

        let result = plan_blend(&t, &[(&b1, 10), (&b2, 10)]);
        assert_eq!(
            result.unwrap_err(),
            BlendError::BloomOutOfRange {
                batch_number: 1,
                bloom: dec("170"),
                min: dec("195"),
                max: dec("205"),
            }
        );
    }

    #[test]
    fn attribute_averages_cover_only_batches_carrying_the_value() {
        // Moisture present on one batch of 10 bags only; its average is that
        // batch's value, not diluted by the other 30 bags
        let mut b1 = batch(1, "200", 10);
        b1.quality.moisture = Some(dec("11"));
        let b2 = batch(2, "200", 30);

        let plan = plan_blend(&target("190", "210"), &[(&b1, 10), (&b2, 30)]).unwrap();
        let moisture = plan
            .attribute_averages
            .iter()
            .find(|a| a.attribute.as_str() == "moisture")
            .expect("moisture average missing");
        assert_eq!(moisture.value, dec("11"));
    }

    #[test]
    fn no_attribute_averages_when_only_bloom_is_recorded() {
        let b = batch(1, "200", 10);
        let plan = plan_blend(&target("190", "210"), &[(&b, 10)]).unwrap();
        assert!(plan.attribute_averages.is_empty());
    }
}

// ============================================================================
// Automatic Selection Tests
// ============================================================================

mod suggestion {
    use super::*;

    #[test]
    fn reports_insufficient_stock() {
        let available = vec![batch(1, "200", 5)];
        let result = suggest_selection(&target("190", "210"), &available, 100);
        assert!(matches!(
            result.unwrap_err(),
            BlendError::InsufficientStock { .. }
        ));
    }

    #[test]
    fn any_in_range_takes_batches_in_number_order() {
        let available = vec![
            batch(3, "200", 10),
            batch(1, "205", 10),
            batch(2, "250", 10), // out of range, skipped
        ];
        let mut t = target("195", "210");
        t.selection_mode = BloomSelectionMode::AnyInRange;

        let picked = suggest_selection(&t, &available, 20).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].batch_id, available[1].id);
        assert_eq!(picked[1].batch_id, available[0].id);
    }

    #[test]
    fn suggestion_satisfies_the_target_when_committed() {
        let available = vec![
            batch(1, "185", 20),
            batch(2, "210", 15),
            batch(3, "220", 10),
        ];
        let t = target("190", "215");

        let picked = suggest_selection(&t, &available, 30).unwrap();
        let total: i32 = picked.iter().map(|s| s.bags).sum();
        assert!(total >= 30);

        // Committing the suggestion through the planner must succeed
        let refs: Vec<(&Batch, i32)> = picked
            .iter()
            .map(|s| {
                (
                    available.iter().find(|b| b.id == s.batch_id).unwrap(),
                    s.bags,
                )
            })
            .collect();
        let plan = plan_blend(&t, &refs).unwrap();
        assert!(plan.average_bloom >= t.bloom_min && plan.average_bloom <= t.bloom_max);
    }

    #[test]
    fn skips_unavailable_and_unmeasured_batches() {
        let mut used = batch(1, "200", 50);
        used.is_used = true;
        let mut unmeasured = batch(2, "200", 50);
        unmeasured.quality.bloom = None;
        let good = batch(3, "200", 10);

        let picked =
            suggest_selection(&target("190", "210"), &[used, unmeasured, good.clone()], 10)
                .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].batch_id, good.id);
    }

    #[test]
    fn rejects_non_positive_required_bags() {
        let available = vec![batch(1, "200", 10)];
        assert!(suggest_selection(&target("190", "210"), &available, 0).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any plan that validates has its weighted average inside the target range
    #[test]
    fn prop_accepted_average_is_inside_range(
        blooms in prop::collection::vec(150i64..=300, 1..8),
        bags in prop::collection::vec(1i32..=50, 8),
    ) {
        let batches: Vec<Batch> = blooms
            .iter()
            .zip(bags.iter())
            .enumerate()
            .map(|(i, (bloom, bags))| batch(i as i32 + 1, &bloom.to_string(), *bags))
            .collect();
        let selection: Vec<(&Batch, i32)> =
            batches.iter().map(|b| (b, b.bags)).collect();

        let t = target("150", "300");
        let plan = plan_blend(&t, &selection).unwrap();
        prop_assert!(plan.average_bloom >= t.bloom_min);
        prop_assert!(plan.average_bloom <= t.bloom_max);
    }

    /// Total weight is always bags times the bag weight
    #[test]
    fn prop_total_weight_follows_bag_count(
        blooms in prop::collection::vec(180i64..=220, 1..6),
    ) {
        let batches: Vec<Batch> = blooms
            .iter()
            .enumerate()
            .map(|(i, bloom)| batch(i as i32 + 1, &bloom.to_string(), 10))
            .collect();
        let selection: Vec<(&Batch, i32)> =
            batches.iter().map(|b| (b, b.bags)).collect();

        let plan = plan_blend(&target("180", "220"), &selection).unwrap();
        prop_assert_eq!(
            plan.total_weight_kg,
            Decimal::from(plan.total_bags) * Decimal::from(BAG_WEIGHT_KG)
        );
    }

    /// A suggestion, when it succeeds, always covers the required bags
    #[test]
    fn prop_suggestion_covers_required_bags(
        blooms in prop::collection::vec(190i64..=210, 1..10),
        required in 1i32..=200,
    ) {
        let available: Vec<Batch> = blooms
            .iter()
            .enumerate()
            .map(|(i, bloom)| batch(i as i32 + 1, &bloom.to_string(), 25))
            .collect();

        if let Ok(picked) = suggest_selection(&target("190", "210"), &available, required) {
            let total: i32 = picked.iter().map(|s| s.bags).sum();
            prop_assert!(total >= required);
        }
    }
}
