//! Tests for fiscal-year tokens, lot numbers and the missing-number report

use proptest::prelude::*;

use shared::{
    find_gaps, fiscal_year_for_date, fiscal_year_token, format_lot_number, next_fiscal_year,
    start_year, validate_fiscal_year, validate_lot_number, NumberGap,
};

// ============================================================================
// Gap Report Tests
// ============================================================================

mod gaps {
    use super::*;

    #[test]
    fn contiguous_numbers_have_no_gaps() {
        assert!(find_gaps(&[1, 2, 3, 4, 5], 1, 5).is_empty());
    }

    #[test]
    fn single_and_run_gaps_are_grouped() {
        let gaps = find_gaps(&[1, 2, 3, 5, 8, 9, 10], 1, 10);
        assert_eq!(gaps, vec![NumberGap::Single(4), NumberGap::Range(6, 7)]);
    }

    #[test]
    fn gap_at_the_start_of_the_window() {
        let gaps = find_gaps(&[4, 5], 1, 5);
        assert_eq!(gaps, vec![NumberGap::Range(1, 3)]);
    }

    #[test]
    fn empty_registry_is_one_big_gap() {
        let gaps = find_gaps(&[], 1, 4);
        assert_eq!(gaps, vec![NumberGap::Range(1, 4)]);
    }

    #[test]
    fn gaps_serialize_singles_as_numbers_and_runs_as_strings() {
        let gaps = find_gaps(&[1, 2, 3, 5, 8, 9, 10], 1, 10);
        let json = serde_json::to_value(&gaps).unwrap();
        assert_eq!(json, serde_json::json!([4, "6-7"]));
    }

    #[test]
    fn gap_display_matches_serialization() {
        assert_eq!(NumberGap::Single(4).to_string(), "4");
        assert_eq!(NumberGap::Range(6, 7).to_string(), "6-7");
    }
}

// ============================================================================
// Fiscal Year Token Tests
// ============================================================================

mod fiscal_years {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn token_suffix_follows_start_year() {
        assert_eq!(fiscal_year_token(2025), "2025-26");
        assert_eq!(fiscal_year_token(1999), "1999-00");
    }

    #[test]
    fn validation_accepts_well_formed_tokens() {
        assert!(validate_fiscal_year("2025-26").is_ok());
        assert!(validate_fiscal_year("2099-00").is_ok());
    }

    #[test]
    fn validation_rejects_mismatched_suffix() {
        assert!(validate_fiscal_year("2025-27").is_err());
    }

    #[test]
    fn validation_rejects_malformed_tokens() {
        assert!(validate_fiscal_year("2025").is_err());
        assert!(validate_fiscal_year("25-26").is_err());
        assert!(validate_fiscal_year("2025-2026").is_err());
    }

    #[test]
    fn successor_year_increments_the_token() {
        assert_eq!(next_fiscal_year("2025-26").unwrap(), "2026-27");
        assert_eq!(next_fiscal_year("1999-00").unwrap(), "2000-01");
    }

    #[test]
    fn start_year_reads_back_the_token() {
        assert_eq!(start_year("2025-26"), Some(2025));
        assert_eq!(start_year("2025-27"), None);
    }

    #[test]
    fn april_starts_the_fiscal_year() {
        let april_first = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(fiscal_year_for_date(april_first), "2025-26");
    }

    #[test]
    fn march_belongs_to_the_previous_fiscal_year() {
        let march_end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert_eq!(fiscal_year_for_date(march_end), "2025-26");
    }
}

// ============================================================================
// Lot Number Tests
// ============================================================================

mod lot_numbers {
    use super::*;

    #[test]
    fn lot_number_format_is_prefix_year_serial() {
        assert_eq!(format_lot_number("2025-26", 42), "GLT-2025-26-0042");
        assert_eq!(format_lot_number("2025-26", 1), "GLT-2025-26-0001");
    }

    #[test]
    fn formatted_lot_numbers_validate() {
        assert!(validate_lot_number(&format_lot_number("2025-26", 42)).is_ok());
    }

    #[test]
    fn validation_rejects_foreign_prefixes_and_short_serials() {
        assert!(validate_lot_number("XYZ-2025-26-0042").is_err());
        assert!(validate_lot_number("GLT-2025-26-42").is_err());
        assert!(validate_lot_number("GLT-2025-27-0042").is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Gaps and existing numbers partition the window: every number in
    /// [min, max] is either registered or inside exactly one reported gap
    #[test]
    fn prop_gaps_complement_existing_numbers(
        numbers in prop::collection::btree_set(1i32..=60, 0..40),
    ) {
        let existing: Vec<i32> = numbers.iter().copied().collect();
        let (min, max) = (1, 60);
        let gaps = find_gaps(&existing, min, max);

        let mut gap_numbers = std::collections::BTreeSet::new();
        for gap in &gaps {
            match gap {
                NumberGap::Single(n) => {
                    gap_numbers.insert(*n);
                }
                NumberGap::Range(a, b) => {
                    prop_assert!(a < b);
                    for n in *a..=*b {
                        gap_numbers.insert(n);
                    }
                }
            }
        }

        for n in min..=max {
            let registered = numbers.contains(&n);
            let in_gap = gap_numbers.contains(&n);
            prop_assert!(registered != in_gap, "number {} misclassified", n);
        }
    }

    /// Every well-formed token round-trips through format and validate
    #[test]
    fn prop_lot_numbers_round_trip(start in 1990i32..2090, serial in 1i32..=9999) {
        let token = fiscal_year_token(start);
        prop_assert!(validate_fiscal_year(&token).is_ok());
        prop_assert!(validate_lot_number(&format_lot_number(&token, serial)).is_ok());
    }
}
