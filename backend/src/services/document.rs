//! Document rendering service
//!
//! Turns confirmed blends into the printable blend sheet (plain text, CSV and
//! PDF) and serializes listings to CSV for spreadsheet hand-off.

use std::sync::Arc;

use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::{style, Alignment, Element, SimplePageDecorator};
use serde::Serialize;

use shared::models::{Blend, BlendSheet};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Document service
#[derive(Clone)]
pub struct DocumentService {
    config: Arc<Config>,
}

impl DocumentService {
    /// Create a new DocumentService instance
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Plain-text blend sheet
    pub fn sheet_text(&self, blend: &Blend) -> String {
        BlendSheet::from_blend(blend).to_text()
    }

    /// CSV rendition of the sheet body
    pub fn sheet_csv(&self, blend: &Blend) -> AppResult<Vec<u8>> {
        let sheet = BlendSheet::from_blend(blend);
        let mut wtr = csv::Writer::from_writer(vec![]);

        for record in sheet.csv_records() {
            wtr.write_record(&record)
                .map_err(|e| AppError::Internal(format!("CSV write error: {}", e)))?;
        }

        wtr.into_inner()
            .map_err(|e| AppError::Internal(format!("CSV finalize error: {}", e)))
    }

    /// PDF blend sheet, one page, header block plus the batch table
    pub fn sheet_pdf(&self, blend: &Blend) -> AppResult<Vec<u8>> {
        let sheet = BlendSheet::from_blend(blend);

        let font_family = genpdf::fonts::from_files(
            &self.config.pdf.font_dir,
            &self.config.pdf.font_family,
            None,
        )
        .map_err(|e| AppError::DocumentRender(format!("Failed to load fonts: {}", e)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Blend Sheet {}", sheet.lot_number));

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(
            Paragraph::new("GELATIN BLEND SHEET")
                .aligned(Alignment::Center)
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(Break::new(1));
        doc.push(Paragraph::new(format!("Lot No:    {}", sheet.lot_number)));
        doc.push(Paragraph::new(format!("Serial No: {}", sheet.serial_number)));
        doc.push(Paragraph::new(format!("Date:      {}", sheet.date)));
        doc.push(Paragraph::new(format!("Target:    {}", sheet.target_line)));
        doc.push(Break::new(1));

        let mut table = TableLayout::new(vec![1, 3, 2, 2]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table
            .row()
            .element(Paragraph::new("No.").styled(style_bold))
            .element(Paragraph::new("Batch").styled(style_bold))
            .element(Paragraph::new("Bloom").aligned(Alignment::Right).styled(style_bold))
            .element(Paragraph::new("Bags").aligned(Alignment::Right).styled(style_bold))
            .push()
            .map_err(|e| AppError::DocumentRender(format!("Table error: {}", e)))?;

        for row in &sheet.rows {
            let label = if row.is_outsource {
                format!("{} (OS)", row.batch_number)
            } else {
                row.batch_number.to_string()
            };
            table
                .row()
                .element(Paragraph::new(row.seq.to_string()))
                .element(Paragraph::new(label))
                .element(Paragraph::new(row.bloom.to_string()).aligned(Alignment::Right))
                .element(Paragraph::new(row.bags.to_string()).aligned(Alignment::Right))
                .push()
                .map_err(|e| AppError::DocumentRender(format!("Table error: {}", e)))?;
        }

        table
            .row()
            .element(Paragraph::new("TOTAL"))
            .element(Paragraph::new(""))
            .element(Paragraph::new(sheet.average_bloom.to_string()).aligned(Alignment::Right))
            .element(Paragraph::new(sheet.total_bags.to_string()).aligned(Alignment::Right))
            .push()
            .map_err(|e| AppError::DocumentRender(format!("Table error: {}", e)))?;

        doc.push(table);
        doc.push(Break::new(1));
        doc.push(Paragraph::new(format!(
            "Total weight: {} kg",
            sheet.total_weight_kg
        )));

        if !sheet.attribute_averages.is_empty() {
            let summary: Vec<String> = sheet
                .attribute_averages
                .iter()
                .map(|a| format!("{} {}", a.attribute, a.value))
                .collect();
            doc.push(Paragraph::new(format!("Averages: {}", summary.join(", "))));
        }

        let mut buf = Vec::new();
        doc.render(&mut buf)
            .map_err(|e| AppError::DocumentRender(format!("PDF render error: {}", e)))?;

        Ok(buf)
    }

    /// Serialize any listing to CSV for spreadsheet export
    pub fn export_to_csv<T: Serialize>(&self, data: &[T]) -> AppResult<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        for item in data {
            wtr.serialize(item)
                .map_err(|e| AppError::Internal(format!("CSV write error: {}", e)))?;
        }

        wtr.into_inner()
            .map_err(|e| AppError::Internal(format!("CSV finalize error: {}", e)))
    }
}
