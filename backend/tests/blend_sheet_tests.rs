//! Tests for the printable blend sheet: rendering, re-parsing and stability

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    parse_sheet_rows, AttributeAverage, Blend, BlendSheet, BlendTarget, BloomSelectionMode,
    NumericAttribute, SelectedBatch, BAG_WEIGHT_KG,
};

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Helper to build a confirmed blend with the given snapshots
fn blend_with(selected: Vec<SelectedBatch>) -> Blend {
    let total_bags: i32 = selected.iter().map(|s| s.bags).sum();
    let weighted: Decimal = selected
        .iter()
        .map(|s| s.bloom * Decimal::from(s.bags))
        .sum();

    Blend {
        id: Uuid::new_v4(),
        fiscal_year: "2025-26".to_string(),
        lot_number: "GLT-2025-26-0042".to_string(),
        serial_number: 42,
        target: BlendTarget {
            bloom_min: dec("190"),
            bloom_max: dec("210"),
            mean_bloom: Some(dec("200")),
            mesh: None,
            selection_mode: BloomSelectionMode::AverageToMean,
        },
        selected_batches: selected,
        total_bags,
        total_weight_kg: Decimal::from(total_bags) * Decimal::from(BAG_WEIGHT_KG),
        average_bloom: weighted / Decimal::from(total_bags),
        attribute_averages: vec![AttributeAverage {
            attribute: NumericAttribute::Moisture,
            value: dec("11"),
        }],
        created_at: Utc.with_ymd_and_hms(2025, 8, 30, 9, 0, 0).unwrap(),
    }
}

fn snapshot(number: i32, bloom: &str, bags: i32, is_outsource: bool) -> SelectedBatch {
    SelectedBatch {
        batch_id: Uuid::new_v4(),
        batch_number: number,
        bloom: dec(bloom),
        bags,
        is_outsource,
    }
}

// ============================================================================
// Rendering Tests
// ============================================================================

mod rendering {
    use super::*;

    #[test]
    fn header_carries_lot_serial_date_and_target() {
        let blend = blend_with(vec![snapshot(12, "200", 10, false)]);
        let text = BlendSheet::from_blend(&blend).to_text();

        assert!(text.contains("GELATIN BLEND SHEET"));
        assert!(text.contains("Lot No:    GLT-2025-26-0042"));
        assert!(text.contains("Serial No: 42"));
        assert!(text.contains("Date:      2025-08-30"));
        assert!(text.contains("Target:    190 - 210 bloom (mean 200)"));
    }

    #[test]
    fn totals_line_shows_average_and_bags() {
        let blend = blend_with(vec![
            snapshot(1, "180", 10, false),
            snapshot(2, "220", 10, false),
        ]);
        let text = BlendSheet::from_blend(&blend).to_text();

        assert!(text.contains("TOTAL"));
        assert!(text.contains("Total weight: 500 kg"));
        assert!(text.contains("Averages: moisture 11"));
    }

    #[test]
    fn outsourced_batches_carry_the_os_marker() {
        let blend = blend_with(vec![
            snapshot(7, "200", 10, false),
            snapshot(3, "205", 5, true),
        ]);
        let text = BlendSheet::from_blend(&blend).to_text();

        assert!(text.contains("3 (OS)"));
        assert!(!text.contains("7 (OS)"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let blend = blend_with(vec![
            snapshot(1, "195", 10, false),
            snapshot(2, "205", 20, true),
        ]);
        let first = BlendSheet::from_blend(&blend).to_text();
        let second = BlendSheet::from_blend(&blend).to_text();
        assert_eq!(first, second);
    }

    #[test]
    fn csv_records_have_header_and_one_row_per_batch() {
        let blend = blend_with(vec![
            snapshot(1, "195", 10, false),
            snapshot(2, "205", 20, true),
        ]);
        let records = BlendSheet::from_blend(&blend).csv_records();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0][0], "seq");
        assert_eq!(records[1], vec!["1", "1", "false", "195", "10"]);
        assert_eq!(records[2], vec!["2", "2", "true", "205", "20"]);
    }
}

// ============================================================================
// Re-parsing Tests
// ============================================================================

mod parsing {
    use super::*;

    #[test]
    fn body_rows_parse_back_from_the_text() {
        let blend = blend_with(vec![
            snapshot(12, "200", 10, false),
            snapshot(3, "205", 5, true),
        ]);
        let sheet = BlendSheet::from_blend(&blend);
        let rows = parse_sheet_rows(&sheet.to_text());

        assert_eq!(rows, sheet.rows);
    }

    #[test]
    fn five_row_sheet_round_trips_with_mid_table_outsource_rows() {
        let blend = blend_with(vec![
            snapshot(1, "195", 10, false),
            snapshot(2, "210", 5, true),
            snapshot(3, "200", 8, false),
            snapshot(4, "190", 12, true),
            snapshot(5, "205", 6, false),
        ]);
        let sheet = BlendSheet::from_blend(&blend);
        let rows = parse_sheet_rows(&sheet.to_text());

        assert_eq!(rows.len(), 5);
        assert_eq!(rows, sheet.rows);
    }

    #[test]
    fn round_trip_survives_a_long_sheet() {
        let selected: Vec<SelectedBatch> = (1..=50)
            .map(|i| snapshot(i, "200", 10, i % 7 == 0))
            .collect();
        let sheet = BlendSheet::from_blend(&blend_with(selected));
        let rows = parse_sheet_rows(&sheet.to_text());

        assert_eq!(rows.len(), 50);
        assert_eq!(rows, sheet.rows);
    }

    #[test]
    fn parser_ignores_header_and_total_lines() {
        let blend = blend_with(vec![snapshot(1, "200", 10, false)]);
        let text = BlendSheet::from_blend(&blend).to_text();
        let rows = parse_sheet_rows(&text);

        // Only the body row, not TOTAL or header lines
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].batch_number, 1);
    }

    #[test]
    fn parser_skips_malformed_lines() {
        let text = "No. Batch Bloom Bags\n1 12 200 10\ngarbage line here\nTOTAL 200 10\n";
        let rows = parse_sheet_rows(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].batch_number, 12);
    }

    #[test]
    fn snapshots_rebuild_from_the_sheet() {
        let blend = blend_with(vec![snapshot(12, "200", 10, true)]);
        let sheet = BlendSheet::from_blend(&blend);
        assert_eq!(sheet.to_selected_batches(), vec![(12, true, dec("200"), 10)]);
    }
}
