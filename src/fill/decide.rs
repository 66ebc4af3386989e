// ⚖️ Nearest-Neighbor Decider
//
// An interior gap between two different agreements belongs to the left one
// only when the gap's own calendar month comes before the left agreement's
// month; otherwise it belongs to the agreement on its right.

use crate::matrix::{AgreementMatrix, SlotValue};
use crate::month::Month;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Which neighbor a gap is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Tie-break for a gap at calendar month `gap` whose left neighbor holds `left`.
///
/// Year is compared to year and month to month.
pub fn choose_side(gap: Month, left: NaiveDate) -> Side {
    let left = Month::of(left);

    if gap.year() < left.year() {
        Side::Left
    } else if gap.year() == left.year() && gap.month() < left.month() {
        Side::Left
    } else {
        Side::Right
    }
}

/// Fill the interior gaps of one row. Returns cells filled.
///
/// First and last slots are never filled here. Neighbor searches read the
/// row as already updated by this pass.
pub fn decide_row(labels: &[NaiveDate], row: &mut [SlotValue]) -> usize {
    let mut filled = 0;

    for slot in 1..row.len().saturating_sub(1) {
        if row[slot].is_some() {
            continue;
        }

        let left = row[..slot].iter().rev().find_map(|value| *value);
        let right = row[slot + 1..].iter().find_map(|value| *value);

        // One-sided gaps can't be decided
        let (Some(left), Some(right)) = (left, right) else {
            continue;
        };

        row[slot] = match choose_side(Month::of(labels[slot]), left) {
            Side::Left => Some(left),
            Side::Right => Some(right),
        };
        filled += 1;
    }

    filled
}

/// Run the decider over every row of the matrix
pub fn decide_gaps(matrix: &mut AgreementMatrix) -> usize {
    let mut total = 0;

    for row in 0..matrix.rows() {
        let (labels, values) = matrix.row_with_labels_mut(row);
        let filled = decide_row(labels, values);
        if filled > 0 {
            debug!(row, filled, "decided interior gaps");
        }
        total += filled;
    }

    info!(filled = total, rows = matrix.rows(), "decide pass complete");
    total
}

// ============================================================================
// TESTS
// ============================================================================
