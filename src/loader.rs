// 📂 Matrix Loader - tabular source → AgreementMatrix
//
// Layout: a header row, `leading_columns` fixed columns (identifier, brand,
// monetary figure, cancellation date, entry count), then one column per
// month whose header is a date. A column whose header matches the status
// header is read back as the row status instead of a slot.
//
// Unparseable slot values become absent. Unparseable slot *headers* are an
// error: the slot sequence is the shape contract every pass relies on.

use crate::config::LayoutConfig;
use crate::error::{FillError, Result};
use crate::matrix::{AgreementMatrix, EntityRow, SlotValue, Status};
use crate::month::{from_excel_serial, parse_date};
use chrono::NaiveDate;
use std::io;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// RAW CELL
// ============================================================================

/// A cell as read from the source, before column-specific interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => parse_date(s),
            RawCell::Number(serial) => from_excel_serial(*serial),
            RawCell::Date(date) => Some(*date),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Number(n) if n.is_finite() => Some(*n),
            RawCell::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, '$' | ',' | ' '))
                    .collect();
                cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    fn as_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawCell::Number(n) => n.to_string(),
            RawCell::Date(date) => date.to_string(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(s.to_string())
        }
    }
}

// ============================================================================
// TABLE → MATRIX
// ============================================================================

/// Where the slot and status columns sit in a header row
struct ColumnPlan {
    slot_columns: Vec<usize>,
    status_column: Option<usize>,
}

fn plan_columns(header: &[RawCell], layout: &LayoutConfig) -> Result<(ColumnPlan, Vec<NaiveDate>)> {
    if header.len() < layout.leading_columns {
        return Err(FillError::MissingColumns {
            expected: layout.leading_columns,
            found: header.len(),
        });
    }

    let mut slot_columns = Vec::new();
    let mut labels = Vec::new();
    let mut status_column = None;

    for (column, cell) in header.iter().enumerate().skip(layout.leading_columns) {
        let text = cell.as_text();
        if text.eq_ignore_ascii_case(&layout.status_header) {
            status_column = Some(column);
            continue;
        }
        // Trailing blank header columns are padding, not slots
        if matches!(cell, RawCell::Empty) {
            continue;
        }

        let label = cell.as_date().ok_or_else(|| FillError::BadSlotLabel {
            column,
            label: text.clone(),
        })?;
        slot_columns.push(column);
        labels.push(label);
    }

    Ok((
        ColumnPlan {
            slot_columns,
            status_column,
        },
        labels,
    ))
}

static EMPTY_CELL: RawCell = RawCell::Empty;

/// Leading column `i`, or empty when the layout has fewer leading columns
fn leading<'a>(cells: &'a [RawCell], layout: &LayoutConfig, i: usize) -> &'a RawCell {
    if i < layout.leading_columns {
        cells.get(i).unwrap_or(&EMPTY_CELL)
    } else {
        &EMPTY_CELL
    }
}

fn entity_from(cells: &[RawCell], layout: &LayoutConfig, plan: &ColumnPlan) -> EntityRow {
    let cell = |i: usize| leading(cells, layout, i);

    EntityRow {
        account_id: cell(0).as_text(),
        brand: cell(1).as_text(),
        mrr: cell(2).as_number(),
        churn_date: cell(3).as_date(),
        entry_count: cell(4)
            .as_number()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32),
        status: plan
            .status_column
            .and_then(|c| cells.get(c))
            .map(|c| Status::from_label(&c.as_text()))
            .unwrap_or_default(),
    }
}

/// Build a matrix from a header row and data rows of raw cells
pub fn matrix_from_table<I>(header: &[RawCell], rows: I, layout: &LayoutConfig) -> Result<AgreementMatrix>
where
    I: IntoIterator<Item = Vec<RawCell>>,
{
    let (plan, labels) = plan_columns(header, layout)?;
    let leading_headers = header[..layout.leading_columns]
        .iter()
        .map(RawCell::as_text)
        .collect();
    let mut matrix = AgreementMatrix::new(labels)?.with_leading_headers(leading_headers);
    let mut coerced = 0usize;

    for cells in rows {
        // Fully blank lines carry no entity
        if cells.iter().all(|c| matches!(c, RawCell::Empty)) {
            continue;
        }

        let values: Vec<SlotValue> = plan
            .slot_columns
            .iter()
            .map(|&column| {
                let raw = cells.get(column).unwrap_or(&EMPTY_CELL);
                let value = raw.as_date();
                if value.is_none() && !matches!(raw, RawCell::Empty) {
                    coerced += 1;
                }
                value
            })
            .collect();

        let entity = entity_from(&cells, layout, &plan);
        matrix.push_row(entity, values)?;
    }

    if coerced > 0 {
        debug!(coerced, "unparseable slot values treated as absent");
    }
    info!(rows = matrix.rows(), slots = matrix.width(), "matrix loaded");

    Ok(matrix)
}

// ============================================================================
// CSV
// ============================================================================

/// Read a matrix from any CSV reader
pub fn read_csv<R: io::Read>(reader: R, layout: &LayoutConfig) -> Result<AgreementMatrix> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<RawCell> = rdr.headers()?.iter().map(RawCell::from).collect();
    let header_len = header.len();

    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() != header_len {
            return Err(FillError::RowWidth {
                row: line,
                expected: header_len,
                found: record.len(),
            });
        }
        rows.push(record.iter().map(RawCell::from).collect());
    }

    matrix_from_table(&header, rows, layout)
}

/// Load a matrix from a CSV file
pub fn load_csv(path: &Path, layout: &LayoutConfig) -> Result<AgreementMatrix> {
    let file = std::fs::File::open(path)?;
    read_csv(io::BufReader::new(file), layout)
}

// ============================================================================
// XLSX
// ============================================================================

#[cfg(feature = "xlsx")]
fn raw_from_calamine(data: &calamine::Data) -> RawCell {
    use calamine::Data;

    match data {
        Data::Empty => RawCell::Empty,
        Data::String(s) if s.trim().is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::DateTime(dt) => from_excel_serial(dt.as_f64())
            .map(RawCell::Date)
            .unwrap_or(RawCell::Empty),
        Data::DateTimeIso(s) => RawCell::Text(s.clone()),
        // Booleans, durations and error cells carry no date
        _ => RawCell::Empty,
    }
}

/// Load a matrix from an XLSX worksheet (first sheet when `sheet` is `None`)
#[cfg(feature = "xlsx")]
pub fn load_xlsx(path: &Path, sheet: Option<&str>, layout: &LayoutConfig) -> Result<AgreementMatrix> {
    use calamine::{open_workbook, Reader, Xlsx};
    use std::fs::File;
    use std::io::BufReader;

    let mut workbook: Xlsx<BufReader<File>> =
        open_workbook(path).map_err(|e: calamine::XlsxError| FillError::Xlsx(e.to_string()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| FillError::Sheet("<first>".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|_| FillError::Sheet(sheet_name.clone()))?;

    let mut rows = range.rows();
    let header: Vec<RawCell> = match rows.next() {
        Some(first) => first.iter().map(raw_from_calamine).collect(),
        None => Vec::new(),
    };
    let width = header.len();

    let data: Vec<Vec<RawCell>> = rows
        .map(|row| {
            let mut cells: Vec<RawCell> = row.iter().map(raw_from_calamine).collect();
            cells.resize(width.max(cells.len()), RawCell::Empty);
            cells
        })
        .collect();

    matrix_from_table(&header, data, layout)
}

/// Load by file extension: `.xlsx` (with the `xlsx` feature) or CSV
pub fn load_path(path: &Path, layout: &LayoutConfig) -> Result<AgreementMatrix> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    if is_xlsx {
        #[cfg(feature = "xlsx")]
        return load_xlsx(path, None, layout);

        #[cfg(not(feature = "xlsx"))]
        return Err(FillError::Xlsx(
            "xlsx support not compiled in (rebuild with --features xlsx)".to_string(),
        ));
    }

    load_csv(path, layout)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = "\
rc_account_id,brand,mrr,churn_date,EntryCount,8/1/2019,9/1/2019,10/1/2019,11/1/2019
A-100,Acme,\"$1,250.00\",,3,08/01/2019,,garbage,08/01/2019
A-200,Globex,99.5,03/31/2020,1,,,,
";

    #[test]
    fn test_read_csv_shape_and_values() {
        let matrix = read_csv(SAMPLE.as_bytes(), &LayoutConfig::default()).unwrap();

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.width(), 4);
        assert_eq!(matrix.labels()[0], ymd(2019, 8, 1));
        assert_eq!(matrix.get(0, 0), Some(ymd(2019, 8, 1)));
        assert_eq!(matrix.get(0, 1), None);
        // Garbage coerced to absent
        assert_eq!(matrix.get(0, 2), None);
        assert_eq!(matrix.get(0, 3), Some(ymd(2019, 8, 1)));
    }

    #[test]
    fn test_read_csv_leading_columns() {
        let matrix = read_csv(SAMPLE.as_bytes(), &LayoutConfig::default()).unwrap();

        let first = matrix.entity(0);
        assert_eq!(first.account_id, "A-100");
        assert_eq!(first.brand, "Acme");
        assert_eq!(first.mrr, Some(1250.0));
        assert_eq!(first.churn_date, None);
        assert_eq!(first.entry_count, Some(3));
        assert_eq!(first.status, Status::Unset);
        assert_eq!(matrix.leading_headers()[0], "rc_account_id");
        assert_eq!(matrix.leading_headers()[4], "EntryCount");

        let second = matrix.entity(1);
        assert_eq!(second.mrr, Some(99.5));
        assert_eq!(second.churn_date, Some(ymd(2020, 3, 31)));
    }

    #[test]
    fn test_read_csv_status_column_read_back() {
        let csv = "\
id,brand,mrr,churn,count,01/01/2021,02/01/2021,Status
X,B,1,,1,01/01/2021,01/01/2021,Done
Y,B,1,,1,,01/01/2021,?
Z,B,1,,1,,,
";
        let matrix = read_csv(csv.as_bytes(), &LayoutConfig::default()).unwrap();

        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.status(0), Status::Done);
        assert_eq!(matrix.status(1), Status::Review);
        assert_eq!(matrix.status(2), Status::Unset);
    }

    #[test]
    fn test_read_csv_rejects_bad_header() {
        let csv = "id,brand,mrr,churn,count,01/01/2021,not-a-month\n";
        let result = read_csv(csv.as_bytes(), &LayoutConfig::default());

        assert!(matches!(
            result,
            Err(FillError::BadSlotLabel { column: 6, .. })
        ));
    }

    #[test]
    fn test_read_csv_rejects_short_header() {
        let csv = "id,brand\n";
        let result = read_csv(csv.as_bytes(), &LayoutConfig::default());

        assert!(matches!(
            result,
            Err(FillError::MissingColumns {
                expected: 5,
                found: 2
            })
        ));
    }

    #[test]
    fn test_read_csv_rejects_non_increasing_labels() {
        let csv = "id,brand,mrr,churn,count,02/01/2021,01/01/2021\n";
        let result = read_csv(csv.as_bytes(), &LayoutConfig::default());

        assert!(matches!(result, Err(FillError::LabelsNotIncreasing { .. })));
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let csv = "\
id,brand,mrr,churn,count,01/01/2021,02/01/2021
X,B,1,,1,01/01/2021
";
        let result = read_csv(csv.as_bytes(), &LayoutConfig::default());

        assert!(result.is_err());
    }

    #[test]
    fn test_custom_leading_columns() {
        let csv = "\
id,2021-01-01,2021-02-01
X,2021-01-01,
";
        let layout = LayoutConfig {
            leading_columns: 1,
            ..Default::default()
        };
        let matrix = read_csv(csv.as_bytes(), &layout).unwrap();

        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.entity(0).account_id, "X");
        assert_eq!(matrix.entity(0).brand, "");
        assert_eq!(matrix.get(0, 0), Some(ymd(2021, 1, 1)));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = "\
id,brand,mrr,churn,count,01/01/2021
X,B,1,,1,01/01/2021
,,,,,
";
        let matrix = read_csv(csv.as_bytes(), &LayoutConfig::default()).unwrap();
        assert_eq!(matrix.rows(), 1);
    }

    #[test]
    fn test_raw_cell_numbers_are_serials_in_date_columns() {
        let header = vec![
            RawCell::from("id"),
            RawCell::from("brand"),
            RawCell::from("mrr"),
            RawCell::from("churn"),
            RawCell::from("count"),
            RawCell::Number(43678.0),
            RawCell::Date(ymd(2019, 9, 1)),
        ];
        let rows = vec![vec![
            RawCell::Number(7.0),
            RawCell::from("Acme"),
            RawCell::Number(10.5),
            RawCell::Empty,
            RawCell::Number(2.0),
            RawCell::Number(43678.0),
            RawCell::Empty,
        ]];

        let matrix = matrix_from_table(&header, rows, &LayoutConfig::default()).unwrap();

        assert_eq!(matrix.labels(), &[ymd(2019, 8, 1), ymd(2019, 9, 1)]);
        assert_eq!(matrix.get(0, 0), Some(ymd(2019, 8, 1)));
        assert_eq!(matrix.entity(0).account_id, "7");
        assert_eq!(matrix.entity(0).mrr, Some(10.5));
        assert_eq!(matrix.entity(0).entry_count, Some(2));
    }

    #[test]
    fn test_huge_serial_slot_value_is_absent() {
        let header = vec![
            RawCell::from("id"),
            RawCell::from("brand"),
            RawCell::from("mrr"),
            RawCell::from("churn"),
            RawCell::from("count"),
            RawCell::Date(ymd(2019, 8, 1)),
            RawCell::Date(ymd(2019, 9, 1)),
        ];
        let rows = vec![vec![
            RawCell::from("acct-1"),
            RawCell::Empty,
            RawCell::Empty,
            RawCell::Number(1e15),
            RawCell::Empty,
            RawCell::Number(1e15),
            RawCell::Number(f64::MAX),
        ]];

        let matrix = matrix_from_table(&header, rows, &LayoutConfig::default()).unwrap();

        assert_eq!(matrix.get(0, 0), None);
        assert_eq!(matrix.get(0, 1), None);
        assert_eq!(matrix.entity(0).churn_date, None);
    }

    #[test]
    fn test_fractional_entry_count_is_absent() {
        let text = "\
rc_account_id,brand,mrr,churn_date,EntryCount,01/01/2021
a,,,,2.7,
b,,,,3,
c,,,,-1,
";
        let matrix = read_csv(text.as_bytes(), &LayoutConfig::default()).unwrap();

        assert_eq!(matrix.entity(0).entry_count, None);
        assert_eq!(matrix.entity(1).entry_count, Some(3));
        assert_eq!(matrix.entity(2).entry_count, None);
    }

    #[cfg(not(feature = "xlsx"))]
    #[test]
    fn test_load_path_xlsx_without_feature() {
        let result = load_path(Path::new("input.xlsx"), &LayoutConfig::default());
        assert!(matches!(result, Err(FillError::Xlsx(_))));
    }
}
