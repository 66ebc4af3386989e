// 🧮 Agreement Matrix - entity × month slot grid
//
// One contiguous store of slot values indexed by (row, slot), plus the shared
// slot labels and the per-entity fixed columns. Fill and review passes only
// mutate slot values and the status field; rows and slots are never created
// or destroyed after construction.

use crate::error::{FillError, Result};
use crate::month::Month;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// A slot holds either an agreement date or nothing
pub type SlotValue = Option<NaiveDate>;

/// Header names of the fixed leading columns, in order
pub const DEFAULT_LEADING_HEADERS: [&str; 5] =
    ["rc_account_id", "brand", "mrr", "churn_date", "EntryCount"];

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Unset,
    /// Observed span has no gaps
    Done,
    /// Needs human review (rendered as "?")
    Review,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Unset => "",
            Status::Done => "Done",
            Status::Review => "?",
        }
    }

    /// Anything other than "Done" or "?" reads back as unset
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Done" => Status::Done,
            "?" => Status::Review,
            _ => Status::Unset,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Unset)
    }

    /// Move to a terminal label. A row settles at most once; returns whether
    /// the status changed.
    pub fn settle(&mut self, terminal: Status) -> bool {
        if self.is_terminal() || !terminal.is_terminal() {
            return false;
        }
        *self = terminal;
        true
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// ENTITY ROW (fixed leading columns)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub account_id: String,
    pub brand: String,
    /// Monthly recurring revenue, kept as read when it doesn't parse
    pub mrr: Option<f64>,
    pub churn_date: Option<NaiveDate>,
    pub entry_count: Option<u32>,
    pub status: Status,
}

impl EntityRow {
    pub fn new(account_id: &str) -> Self {
        EntityRow {
            account_id: account_id.to_string(),
            ..Default::default()
        }
    }
}

// ============================================================================
// HIGHLIGHT COORDINATE
// ============================================================================

/// A flagged (row, slot) cell, 0-based in matrix coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Highlight {
    pub row: usize,
    pub slot: usize,
}

impl Highlight {
    pub fn new(row: usize, slot: usize) -> Self {
        Highlight { row, slot }
    }

    /// 1-based (row, column) in a written sheet: one header row above the
    /// data, `leading_columns` fixed columns before the first slot.
    pub fn sheet_cell(&self, leading_columns: usize) -> (usize, usize) {
        (self.row + 2, leading_columns + self.slot + 1)
    }
}

// ============================================================================
// MATRIX
// ============================================================================

fn default_leading_headers() -> Vec<String> {
    DEFAULT_LEADING_HEADERS.iter().map(|h| h.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgreementMatrix {
    leading_headers: Vec<String>,
    labels: Vec<NaiveDate>,
    label_index: HashMap<Month, usize>,
    entities: Vec<EntityRow>,
    cells: Vec<SlotValue>,
}

impl AgreementMatrix {
    /// Build an empty matrix (no rows) over the given slot labels.
    ///
    /// Labels must be strictly increasing calendar months.
    pub fn new(labels: Vec<NaiveDate>) -> Result<Self> {
        let mut label_index = HashMap::with_capacity(labels.len());

        for (slot, pair) in labels.windows(2).enumerate() {
            if Month::of(pair[1]) <= Month::of(pair[0]) {
                return Err(FillError::LabelsNotIncreasing {
                    previous: Month::of(pair[0]).to_string(),
                    next: Month::of(pair[1]).to_string(),
                });
            }
            label_index.insert(Month::of(pair[0]), slot);
        }
        if let Some(last) = labels.last() {
            label_index.insert(Month::of(*last), labels.len() - 1);
        }

        Ok(AgreementMatrix {
            leading_headers: default_leading_headers(),
            labels,
            label_index,
            entities: Vec::new(),
            cells: Vec::new(),
        })
    }

    /// Build a matrix with one slot label per month from `start` to `end`
    pub fn for_months(start: Month, end: Month) -> Self {
        let labels: Vec<NaiveDate> = Month::range_inclusive(start, end)
            .iter()
            .map(Month::first_day)
            .collect();
        let label_index = Month::range_inclusive(start, end)
            .into_iter()
            .enumerate()
            .map(|(slot, month)| (month, slot))
            .collect();

        AgreementMatrix {
            leading_headers: default_leading_headers(),
            labels,
            label_index,
            entities: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Replace the leading column header names (kept for writing back)
    pub fn with_leading_headers(mut self, headers: Vec<String>) -> Self {
        self.leading_headers = headers;
        self
    }

    pub fn leading_headers(&self) -> &[String] {
        &self.leading_headers
    }

    /// Append a row. `values` must cover every slot.
    pub fn push_row(&mut self, entity: EntityRow, values: Vec<SlotValue>) -> Result<usize> {
        if values.len() != self.width() {
            return Err(FillError::RowWidth {
                row: self.entities.len(),
                expected: self.width(),
                found: values.len(),
            });
        }
        self.entities.push(entity);
        self.cells.extend(values);
        Ok(self.entities.len() - 1)
    }

    // ========================================================================
    // SHAPE
    // ========================================================================

    /// Number of entity rows
    pub fn rows(&self) -> usize {
        self.entities.len()
    }

    /// Number of slots per row
    pub fn width(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[NaiveDate] {
        &self.labels
    }

    /// Calendar month of a slot's label
    pub fn label_month(&self, slot: usize) -> Month {
        Month::of(self.labels[slot])
    }

    /// Slot index for a calendar month, if the matrix covers it
    pub fn slot_of(&self, month: Month) -> Option<usize> {
        self.label_index.get(&month).copied()
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn get(&self, row: usize, slot: usize) -> SlotValue {
        self.cells[row * self.width() + slot]
    }

    pub fn set(&mut self, row: usize, slot: usize, value: SlotValue) {
        let width = self.width();
        self.cells[row * width + slot] = value;
    }

    pub fn is_absent(&self, row: usize, slot: usize) -> bool {
        self.get(row, slot).is_none()
    }

    pub fn row(&self, row: usize) -> &[SlotValue] {
        let width = self.width();
        &self.cells[row * width..(row + 1) * width]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [SlotValue] {
        let width = self.width();
        &mut self.cells[row * width..(row + 1) * width]
    }

    pub fn entity(&self, row: usize) -> &EntityRow {
        &self.entities[row]
    }

    pub fn entity_mut(&mut self, row: usize) -> &mut EntityRow {
        &mut self.entities[row]
    }

    pub fn entities(&self) -> &[EntityRow] {
        &self.entities
    }

    pub fn status(&self, row: usize) -> Status {
        self.entities[row].status
    }

    /// Split borrow: read-only labels alongside one mutable row of values
    pub fn row_with_labels_mut(&mut self, row: usize) -> (&[NaiveDate], &mut [SlotValue]) {
        let width = self.labels.len();
        (&self.labels, &mut self.cells[row * width..(row + 1) * width])
    }

    /// Split borrow: one row's values alongside its mutable entity fields
    pub fn row_with_entity_mut(&mut self, row: usize) -> (&[SlotValue], &mut EntityRow) {
        let width = self.labels.len();
        (&self.cells[row * width..(row + 1) * width], &mut self.entities[row])
    }

    // ========================================================================
    // SUMMARY
    // ========================================================================

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn count_status(&self, status: Status) -> usize {
        self.entities.iter().filter(|e| e.status == status).count()
    }

    /// SHA-256 over the slot grid (labels and values), for run reports
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for label in &self.labels {
            hasher.update(label.to_string());
        }
        for (i, cell) in self.cells.iter().enumerate() {
            if i % self.width().max(1) == 0 {
                hasher.update(b"\n");
            }
            match cell {
                Some(date) => hasher.update(date.to_string()),
                None => hasher.update(b"_"),
            }
            hasher.update(b",");
        }
        format!("{:x}", hasher.finalize())
    }
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

    fn small_matrix() -> AgreementMatrix {
        let mut matrix = AgreementMatrix::for_months(
            Month::new(2021, 1).unwrap(),
            Month::new(2021, 4).unwrap(),
        );
        matrix
            .push_row(
                EntityRow::new("acct-1"),
                vec![Some(ymd(2021, 1, 1)), None, None, Some(ymd(2021, 1, 1))],
            )
            .unwrap();
        matrix
            .push_row(EntityRow::new("acct-2"), vec![None; 4])
            .unwrap();
        matrix
    }

    #[test]
    fn test_shape_and_accessors() {
        let mut matrix = small_matrix();

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.width(), 4);
        assert_eq!(matrix.get(0, 0), Some(ymd(2021, 1, 1)));
        assert!(matrix.is_absent(0, 1));

        matrix.set(1, 2, Some(ymd(2020, 6, 1)));
        assert_eq!(matrix.row(1), &[None, None, Some(ymd(2020, 6, 1)), None]);
        assert_eq!(matrix.filled_count(), 3);
    }

    #[test]
    fn test_label_index_lookup() {
        let matrix = small_matrix();

        assert_eq!(matrix.slot_of(Month::new(2021, 1).unwrap()), Some(0));
        assert_eq!(matrix.slot_of(Month::new(2021, 4).unwrap()), Some(3));
        assert_eq!(matrix.slot_of(Month::new(2021, 5).unwrap()), None);
        assert_eq!(matrix.label_month(2), Month::new(2021, 3).unwrap());
    }

    #[test]
    fn test_new_rejects_non_increasing_labels() {
        let result = AgreementMatrix::new(vec![ymd(2021, 1, 1), ymd(2021, 3, 1), ymd(2021, 3, 15)]);
        assert!(matches!(result, Err(FillError::LabelsNotIncreasing { .. })));

        let ok = AgreementMatrix::new(vec![ymd(2021, 1, 31), ymd(2021, 2, 28)]).unwrap();
        assert_eq!(ok.slot_of(Month::new(2021, 2).unwrap()), Some(1));
    }

    #[test]
    fn test_for_months_labels_strictly_increase() {
        let matrix =
            AgreementMatrix::for_months(Month::new(2020, 11).unwrap(), Month::new(2021, 2).unwrap());
        assert!(matrix.labels().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(matrix.width(), 4);

        // Ends at chrono's last representable month without wrapping
        let last = Month::of(NaiveDate::MAX);
        let matrix = AgreementMatrix::for_months(last, last);
        assert_eq!(matrix.width(), 1);
        assert_eq!(matrix.slot_of(last), Some(0));
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut matrix = small_matrix();
        let result = matrix.push_row(EntityRow::new("short"), vec![None; 3]);

        assert!(matches!(
            result,
            Err(FillError::RowWidth {
                row: 2,
                expected: 4,
                found: 3
            })
        ));
        assert_eq!(matrix.rows(), 2);
    }

    #[test]
    fn test_status_settles_once() {
        let mut status = Status::Unset;

        assert!(status.settle(Status::Done));
        assert_eq!(status, Status::Done);

        // Already terminal: neither relabel nor repeat
        assert!(!status.settle(Status::Review));
        assert!(!status.settle(Status::Done));
        assert_eq!(status, Status::Done);

        let mut unset = Status::Unset;
        assert!(!unset.settle(Status::Unset));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Done.label(), "Done");
        assert_eq!(Status::Review.label(), "?");
        assert_eq!(Status::Unset.label(), "");
        assert_eq!(Status::from_label(" ? "), Status::Review);
        assert_eq!(Status::from_label("Done"), Status::Done);
        assert_eq!(Status::from_label("whatever"), Status::Unset);
    }

    #[test]
    fn test_highlight_sheet_cell() {
        // Row 0 sits under the header (sheet row 2); slot 0 follows 5 leading columns
        assert_eq!(Highlight::new(0, 0).sheet_cell(5), (2, 6));
        assert_eq!(Highlight::new(3, 10).sheet_cell(5), (5, 16));
    }

    #[test]
    fn test_fingerprint_tracks_values() {
        let mut matrix = small_matrix();
        let before = matrix.fingerprint();
        assert_eq!(before, small_matrix().fingerprint());

        matrix.set(0, 1, Some(ymd(2021, 1, 1)));
        assert_ne!(before, matrix.fingerprint());
    }
}
