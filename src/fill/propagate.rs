// ➡️ Right Propagator
//
// The last recorded agreement stays in force into the following months as
// long as the slot's calendar month has not passed the agreement's own month.

use crate::matrix::{AgreementMatrix, SlotValue};
use crate::month::Month;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Extend the rightmost value of one row. Returns cells filled.
///
/// Stops at the first slot whose month is later than the value's month and
/// never resumes, even if a later label were (wrongly) earlier again.
pub fn propagate_row(labels: &[NaiveDate], row: &mut [SlotValue]) -> usize {
    let Some(last) = row.iter().rposition(Option::is_some) else {
        return 0;
    };
    let Some(value) = row[last] else {
        return 0;
    };
    let limit = Month::of(value);

    let mut filled = 0;
    for slot in last + 1..row.len() {
        if Month::of(labels[slot]) > limit {
            break;
        }
        row[slot] = Some(value);
        filled += 1;
    }

    filled
}

/// Run the propagator over every row of the matrix
pub fn propagate_right(matrix: &mut AgreementMatrix) -> usize {
    let mut total = 0;

    for row in 0..matrix.rows() {
        let (labels, values) = matrix.row_with_labels_mut(row);
        let filled = propagate_row(labels, values);
        if filled > 0 {
            debug!(row, filled, "propagated last agreement rightward");
        }
        total += filled;
    }

    info!(filled = total, rows = matrix.rows(), "propagate pass complete");
    total
}

// ============================================================================
// TESTS
// ============================================================================
