//! Tests for row-tolerant lab report validation

use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{validate_extracted_row, ExtractedReportRow};

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn row(batch_number: i32) -> ExtractedReportRow {
    ExtractedReportRow {
        batch_number: Some(batch_number),
        bags: Some(10),
        bloom: Some(dec("200")),
        ..Default::default()
    }
}

// ============================================================================
// Accepted Rows
// ============================================================================

mod accepted {
    use super::*;

    #[test]
    fn complete_row_passes() {
        let fields = validate_extracted_row(&row(12)).unwrap();
        assert_eq!(fields.batch_number, 12);
        assert_eq!(fields.bags, 10);
        assert_eq!(fields.quality.bloom, Some(dec("200")));
    }

    #[test]
    fn missing_bags_default_to_zero() {
        let mut r = row(12);
        r.bags = None;
        let fields = validate_extracted_row(&r).unwrap();
        assert_eq!(fields.bags, 0);
    }

    #[test]
    fn batch_number_alone_is_enough() {
        // Extraction often reads only the first column reliably
        let r = ExtractedReportRow {
            batch_number: Some(3),
            ..Default::default()
        };
        let fields = validate_extracted_row(&r).unwrap();
        assert_eq!(fields.batch_number, 3);
        assert!(fields.quality.is_empty());
    }

    #[test]
    fn boundary_measurements_pass() {
        let mut r = row(12);
        r.ph = Some(dec("14"));
        r.moisture = Some(dec("100"));
        r.percentage = Some(Decimal::ZERO);
        assert!(validate_extracted_row(&r).is_ok());
    }

    #[test]
    fn string_attributes_are_carried_through() {
        let mut r = row(12);
        r.color = Some("light amber".to_string());
        r.odour = Some("neutral".to_string());
        let fields = validate_extracted_row(&r).unwrap();
        assert_eq!(fields.quality.color.as_deref(), Some("light amber"));
        assert_eq!(fields.quality.odour.as_deref(), Some("neutral"));
    }
}

// ============================================================================
// Skipped Rows
// ============================================================================

mod skipped {
    use super::*;

    #[test]
    fn missing_batch_number_is_refused() {
        let r = ExtractedReportRow {
            bags: Some(10),
            ..Default::default()
        };
        let reason = validate_extracted_row(&r).unwrap_err();
        assert!(reason.contains("batch number"));
    }

    #[test]
    fn non_positive_batch_number_is_refused() {
        let mut r = row(0);
        assert!(validate_extracted_row(&r).is_err());
        r.batch_number = Some(-3);
        assert!(validate_extracted_row(&r).is_err());
    }

    #[test]
    fn negative_bags_are_refused() {
        let mut r = row(12);
        r.bags = Some(-1);
        assert!(validate_extracted_row(&r).is_err());
    }

    #[test]
    fn non_positive_bloom_is_refused() {
        let mut r = row(12);
        r.bloom = Some(Decimal::ZERO);
        assert!(validate_extracted_row(&r).is_err());
    }

    #[test]
    fn out_of_range_ph_is_refused() {
        let mut r = row(12);
        r.ph = Some(dec("14.5"));
        let reason = validate_extracted_row(&r).unwrap_err();
        assert!(reason.contains("pH"));
    }

    #[test]
    fn out_of_range_moisture_is_refused() {
        let mut r = row(12);
        r.moisture = Some(dec("101"));
        assert!(validate_extracted_row(&r).is_err());
    }

    #[test]
    fn out_of_range_percentage_is_refused() {
        let mut r = row(12);
        r.percentage = Some(dec("-5"));
        assert!(validate_extracted_row(&r).is_err());
    }

    #[test]
    fn one_bad_row_does_not_taint_its_neighbours() {
        let rows = vec![
            row(1),
            ExtractedReportRow::default(), // no batch number
            row(3),
        ];
        let results: Vec<_> = rows.iter().map(validate_extracted_row).collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
