/// Expense export
///
/// CSV carries every exported row; the PDF is a printable table capped at
/// `MAX_PDF_ROWS` rows.

use chrono::{NaiveDate, SecondsFormat};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use serde::Deserialize;

use super::model::Expense;
use crate::error::AppError;

pub const MAX_EXPORT_ROWS: usize = 5000;
pub const MAX_PDF_ROWS: usize = 500;

const CSV_HEADER: [&str; 5] = ["id", "description", "amount", "category", "date"];

// A4 portrait, millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 277.0;
const BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 6.0;
const COL_DESCRIPTION: f32 = 14.0;
const COL_CATEGORY: f32 = 110.0;
const COL_AMOUNT: f32 = 145.0;
const COL_DATE: f32 = 172.0;
const DESCRIPTION_CHARS: usize = 55;
const CATEGORY_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Render `rows` in `format` as a download named after `day`.
pub fn render_export(
    rows: &[Expense],
    format: ExportFormat,
    day: NaiveDate,
) -> Result<ExportFile, AppError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(rows)?,
        ExportFormat::Pdf => to_pdf(rows)?,
    };

    Ok(ExportFile {
        bytes,
        content_type: format.content_type(),
        filename: format!("expenses-{}.{}", day.format("%Y-%m-%d"), format.extension()),
    })
}

pub fn to_csv(rows: &[Expense]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;

    for row in rows {
        writer
            .write_record([
                row.id.to_string().as_str(),
                row.description.as_str(),
                row.amount.as_str(),
                row.category.as_str(),
                row.date.to_rfc3339_opts(SecondsFormat::Millis, true).as_str(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV export failed: {}", e))
}

pub fn to_pdf(rows: &[Expense]) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) =
        PdfDocument::new("Expenses Export", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    let mut layer = doc.get_page(page).get_layer(layer);
    let mut y = TOP;

    layer.use_text("Expenses Export", 16.0, Mm(COL_DESCRIPTION), Mm(y), &bold);
    y -= 8.0;
    let shown = rows.len().min(MAX_PDF_ROWS);
    let summary = if rows.len() > shown {
        format!("Rows: {} (first {} shown)", rows.len(), shown)
    } else {
        format!("Rows: {}", rows.len())
    };
    layer.use_text(summary, 10.0, Mm(COL_DESCRIPTION), Mm(y), &regular);
    y -= 12.0;

    draw_header(&layer, &bold, y);
    y -= ROW_HEIGHT + 2.0;

    for row in rows.iter().take(MAX_PDF_ROWS) {
        if y < BOTTOM {
            let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(next_page).get_layer(next_layer);
            y = TOP;
            draw_header(&layer, &bold, y);
            y -= ROW_HEIGHT + 2.0;
        }

        layer.use_text(clip(&row.description, DESCRIPTION_CHARS), 9.0, Mm(COL_DESCRIPTION), Mm(y), &regular);
        layer.use_text(clip(&row.category, CATEGORY_CHARS), 9.0, Mm(COL_CATEGORY), Mm(y), &regular);
        layer.use_text(row.amount.as_str(), 9.0, Mm(COL_AMOUNT), Mm(y), &regular);
        layer.use_text(row.date.format("%Y-%m-%d").to_string(), 9.0, Mm(COL_DATE), Mm(y), &regular);
        y -= ROW_HEIGHT;
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn draw_header(layer: &PdfLayerReference, font: &IndirectFontRef, y: f32) {
    layer.use_text("Description", 10.0, Mm(COL_DESCRIPTION), Mm(y), font);
    layer.use_text("Category", 10.0, Mm(COL_CATEGORY), Mm(y), font);
    layer.use_text("Amount", 10.0, Mm(COL_AMOUNT), Mm(y), font);
    layer.use_text("Date", 10.0, Mm(COL_DATE), Mm(y), font);
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars - 3).collect();
    clipped.push_str("...");
    clipped
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("PDF export failed: {:?}", e))
}
