// 💾 Matrix Writer - AgreementMatrix → CSV / XLSX, plus highlight sidecar
//
// Output mirrors the input layout: leading columns, one column per slot
// label, then the status column. Highlights are a presentation concern; CSV
// cannot carry a fill, so they are also written as a JSON sidecar in sheet
// coordinates.

use crate::config::PipelineConfig;
use crate::error::{FillError, Result};
use crate::matrix::{AgreementMatrix, EntityRow, Highlight};
use crate::month::format_date;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// CELL TEXT
// ============================================================================

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Text of leading column `i` for one entity
fn leading_text(entity: &EntityRow, i: usize, date_format: &str) -> String {
    match i {
        0 => entity.account_id.clone(),
        1 => entity.brand.clone(),
        2 => entity.mrr.map(format_number).unwrap_or_default(),
        3 => entity
            .churn_date
            .map(|d| format_date(d, date_format))
            .unwrap_or_default(),
        4 => entity.entry_count.map(|n| n.to_string()).unwrap_or_default(),
        _ => String::new(),
    }
}

fn header_row(matrix: &AgreementMatrix, config: &PipelineConfig) -> Vec<String> {
    let mut header: Vec<String> = matrix.leading_headers().to_vec();
    header.extend(
        matrix
            .labels()
            .iter()
            .map(|label| format_date(*label, &config.date_format)),
    );
    header.push(config.layout.status_header.clone());
    header
}

fn data_row(matrix: &AgreementMatrix, row: usize, config: &PipelineConfig) -> Vec<String> {
    let entity = matrix.entity(row);
    let mut cells: Vec<String> = (0..matrix.leading_headers().len())
        .map(|i| leading_text(entity, i, &config.date_format))
        .collect();
    cells.extend(matrix.row(row).iter().map(|value| {
        value
            .map(|d| format_date(d, &config.date_format))
            .unwrap_or_default()
    }));
    cells.push(entity.status.label().to_string());
    cells
}

// ============================================================================
// CSV
// ============================================================================

/// Write the matrix as CSV to any writer
pub fn write_csv<W: io::Write>(matrix: &AgreementMatrix, writer: W, config: &PipelineConfig) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(header_row(matrix, config))?;
    for row in 0..matrix.rows() {
        wtr.write_record(data_row(matrix, row, config))?;
    }
    wtr.flush()?;

    Ok(())
}

/// Write the matrix to a CSV file
pub fn save_csv(matrix: &AgreementMatrix, path: &Path, config: &PipelineConfig) -> Result<()> {
    let file = fs::File::create(path)?;
    write_csv(matrix, io::BufWriter::new(file), config)?;
    info!(path = %path.display(), rows = matrix.rows(), "csv written");
    Ok(())
}

// ============================================================================
// HIGHLIGHT SIDECAR
// ============================================================================

/// One highlighted cell in written-sheet coordinates (1-based, header row 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub row: usize,
    pub column: usize,
    pub account_id: String,
    pub slot_label: String,
}

pub fn highlight_records(
    matrix: &AgreementMatrix,
    highlights: &[Highlight],
    config: &PipelineConfig,
) -> Vec<HighlightRecord> {
    let leading = matrix.leading_headers().len();

    highlights
        .iter()
        .filter(|h| h.row < matrix.rows() && h.slot < matrix.width())
        .map(|h| {
            let (row, column) = h.sheet_cell(leading);
            HighlightRecord {
                row,
                column,
                account_id: matrix.entity(h.row).account_id.clone(),
                slot_label: format_date(matrix.labels()[h.slot], &config.date_format),
            }
        })
        .collect()
}

pub fn save_highlights_json(
    matrix: &AgreementMatrix,
    highlights: &[Highlight],
    path: &Path,
    config: &PipelineConfig,
) -> Result<()> {
    let records = highlight_records(matrix, highlights, config);
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(path, json)?;
    info!(path = %path.display(), highlights = records.len(), "highlights written");
    Ok(())
}

// ============================================================================
// XLSX
// ============================================================================

/// Write the matrix to an XLSX workbook, filling highlighted cells
#[cfg(feature = "xlsx")]
pub fn save_xlsx(
    matrix: &AgreementMatrix,
    highlights: &[Highlight],
    path: &Path,
    config: &PipelineConfig,
) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();
    let ws = book
        .get_sheet_by_name_mut("Sheet1")
        .ok_or_else(|| FillError::Sheet("Sheet1".to_string()))?;

    for (i, text) in header_row(matrix, config).into_iter().enumerate() {
        ws.get_cell_mut((i as u32 + 1, 1)).set_value_string(text);
    }

    for row in 0..matrix.rows() {
        let sheet_row = row as u32 + 2;
        let entity = matrix.entity(row);

        for (i, text) in data_row(matrix, row, config).into_iter().enumerate() {
            let col = i as u32 + 1;
            let number = match i {
                2 => entity.mrr,
                4 => entity.entry_count.map(f64::from),
                _ => None,
            };
            match number {
                Some(n) if i < matrix.leading_headers().len() => {
                    ws.get_cell_mut((col, sheet_row)).set_value_number(n);
                }
                _ if text.is_empty() => {}
                _ => {
                    ws.get_cell_mut((col, sheet_row)).set_value_string(text);
                }
            }
        }
    }

    for record in highlight_records(matrix, highlights, config) {
        ws.get_style_mut((record.column as u32, record.row as u32))
            .set_background_color(config.highlight_color.as_str());
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|e| FillError::Xlsx(e.to_string()))?;
    info!(
        path = %path.display(),
        rows = matrix.rows(),
        highlights = highlights.len(),
        "xlsx written"
    );
    Ok(())
}

/// Save by file extension: `.xlsx` (with the `xlsx` feature) or CSV.
///
/// CSV output cannot carry highlights; use [`save_highlights_json`] for those.
pub fn save_path(
    matrix: &AgreementMatrix,
    highlights: &[Highlight],
    path: &Path,
    config: &PipelineConfig,
) -> Result<()> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    if is_xlsx {
        #[cfg(feature = "xlsx")]
        return save_xlsx(matrix, highlights, path, config);

        #[cfg(not(feature = "xlsx"))]
        return Err(FillError::Xlsx(
            "xlsx support not compiled in (rebuild with --features xlsx)".to_string(),
        ));
    }

    if !highlights.is_empty() {
        warn!(
            path = %path.display(),
            highlights = highlights.len(),
            "csv output cannot carry highlights; write them with save_highlights_json"
        );
    }
    save_csv(matrix, path, config)
}

// ============================================================================
// TESTS
// ============================================================================
