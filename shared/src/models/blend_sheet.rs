//! Printable blend-sheet projection
//!
//! Pure formatting over a confirmed blend: same blend in, same sheet out.
//! The tabular body is machine-readable so downstream checks can re-parse
//! what was printed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::blend::{AttributeAverage, Blend};

/// One printed row of the sheet body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SheetRow {
    /// 1-based position on the sheet
    pub seq: usize,
    pub batch_number: i32,
    pub is_outsource: bool,
    pub bloom: Decimal,
    pub bags: i32,
}

/// Header, body rows, totals and attribute summary of a blend sheet
#[derive(Debug, Clone, Serialize)]
pub struct BlendSheet {
    pub lot_number: String,
    pub serial_number: i32,
    pub date: NaiveDate,
    pub target_line: String,
    pub rows: Vec<SheetRow>,
    pub total_bags: i32,
    pub total_weight_kg: Decimal,
    pub average_bloom: Decimal,
    pub attribute_averages: Vec<AttributeAverage>,
}

impl BlendSheet {
    /// Project a blend into its printable sheet
    pub fn from_blend(blend: &Blend) -> Self {
        let target_line = match blend.target.mean_bloom {
            Some(mean) => format!(
                "{} - {} bloom (mean {})",
                blend.target.bloom_min, blend.target.bloom_max, mean
            ),
            None => format!(
                "{} - {} bloom",
                blend.target.bloom_min, blend.target.bloom_max
            ),
        };

        let rows = blend
            .selected_batches
            .iter()
            .enumerate()
            .map(|(i, s)| SheetRow {
                seq: i + 1,
                batch_number: s.batch_number,
                is_outsource: s.is_outsource,
                bloom: s.bloom,
                bags: s.bags,
            })
            .collect();

        BlendSheet {
            lot_number: blend.lot_number.clone(),
            serial_number: blend.serial_number,
            date: blend.created_at.date_naive(),
            target_line,
            rows,
            total_bags: blend.total_bags,
            total_weight_kg: blend.total_weight_kg,
            average_bloom: blend.average_bloom,
            attribute_averages: blend.attribute_averages.clone(),
        }
    }

    /// Fixed-width text rendition.
    ///
    /// Body rows are whitespace-delimited `seq batch [(OS)] bloom bags` and
    /// can be read back with [`parse_sheet_rows`].
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("GELATIN BLEND SHEET\n");
        out.push_str(&format!("Lot No:    {}\n", self.lot_number));
        out.push_str(&format!("Serial No: {}\n", self.serial_number));
        out.push_str(&format!("Date:      {}\n", self.date));
        out.push_str(&format!("Target:    {}\n", self.target_line));
        out.push('\n');
        out.push_str(&format!(
            "{:<5} {:<12} {:>10} {:>6}\n",
            "No.", "Batch", "Bloom", "Bags"
        ));
        for row in &self.rows {
            let label = if row.is_outsource {
                format!("{} (OS)", row.batch_number)
            } else {
                row.batch_number.to_string()
            };
            out.push_str(&format!(
                "{:<5} {:<12} {:>10} {:>6}\n",
                row.seq, label, row.bloom, row.bags
            ));
        }
        out.push_str(&format!(
            "{:<5} {:<12} {:>10} {:>6}\n",
            "TOTAL", "", self.average_bloom, self.total_bags
        ));
        out.push('\n');
        out.push_str(&format!("Total weight: {} kg\n", self.total_weight_kg));
        if !self.attribute_averages.is_empty() {
            let summary: Vec<String> = self
                .attribute_averages
                .iter()
                .map(|a| format!("{} {}", a.attribute, a.value))
                .collect();
            out.push_str(&format!("Averages: {}\n", summary.join(", ")));
        }
        out
    }

    /// CSV records for the tabular export: header plus one row per batch
    pub fn csv_records(&self) -> Vec<Vec<String>> {
        let mut records = vec![vec![
            "seq".to_string(),
            "batch_number".to_string(),
            "outsource".to_string(),
            "bloom".to_string(),
            "bags".to_string(),
        ]];
        for row in &self.rows {
            records.push(vec![
                row.seq.to_string(),
                row.batch_number.to_string(),
                row.is_outsource.to_string(),
                row.bloom.to_string(),
                row.bags.to_string(),
            ]);
        }
        records
    }

    /// Rebuild the snapshots this sheet was printed from
    pub fn to_selected_batches(&self) -> Vec<(i32, bool, Decimal, i32)> {
        self.rows
            .iter()
            .map(|r| (r.batch_number, r.is_outsource, r.bloom, r.bags))
            .collect()
    }
}

/// Parse the body rows back out of a [`BlendSheet::to_text`] rendition.
///
/// Lines before the `No.` header and from the `TOTAL` row onward are ignored;
/// malformed lines in between are skipped.
pub fn parse_sheet_rows(text: &str) -> Vec<SheetRow> {
    let mut rows = Vec::new();
    let mut in_body = false;
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };
        if first == "No." {
            in_body = true;
            continue;
        }
        if first == "TOTAL" {
            break;
        }
        if !in_body {
            continue;
        }

        let Ok(seq) = first.parse::<usize>() else { continue };
        let Some(batch_token) = tokens.next() else { continue };
        let Ok(batch_number) = batch_token.parse::<i32>() else {
            continue;
        };
        let mut next = match tokens.next() {
            Some(t) => t,
            None => continue,
        };
        let is_outsource = next == "(OS)";
        if is_outsource {
            next = match tokens.next() {
                Some(t) => t,
                None => continue,
            };
        }
        let Ok(bloom) = next.parse::<Decimal>() else { continue };
        let Some(bags_token) = tokens.next() else { continue };
        let Ok(bags) = bags_token.parse::<i32>() else { continue };

        rows.push(SheetRow {
            seq,
            batch_number,
            is_outsource,
            bloom,
            bags,
        });
    }
    rows
}

/// Convenience: project and render in one step
pub fn render_blend_sheet(blend: &Blend) -> String {
    BlendSheet::from_blend(blend).to_text()
}
