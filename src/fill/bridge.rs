// 🌉 Equal-Neighbor Bridge
//
// A gap bounded on both sides by the same agreement date was covered by that
// agreement the whole time. Only the first non-absent slot to the right is
// ever considered, so a different value in between blocks the bridge.

use crate::matrix::{AgreementMatrix, SlotValue};
use tracing::{debug, info};

/// Fill gaps in one row whose bounding values are equal. Returns cells filled.
pub fn bridge_row(row: &mut [SlotValue]) -> usize {
    let mut filled = 0;
    let mut left = 0;

    while left < row.len() {
        let Some(value) = row[left] else {
            left += 1;
            continue;
        };

        let Some(right) = (left + 1..row.len()).find(|&slot| row[slot].is_some()) else {
            break;
        };

        if row[right] == Some(value) {
            for cell in &mut row[left + 1..right] {
                *cell = Some(value);
            }
            filled += right - left - 1;
        }

        // The right neighbor anchors the next comparison, matched or not
        left = right;
    }

    filled
}

/// Run the bridge over every row of the matrix
pub fn bridge_equal_neighbors(matrix: &mut AgreementMatrix) -> usize {
    let mut total = 0;

    for row in 0..matrix.rows() {
        let filled = bridge_row(matrix.row_mut(row));
        if filled > 0 {
            debug!(row, filled, "bridged equal-neighbor gaps");
        }
        total += filled;
    }

    info!(filled = total, rows = matrix.rows(), "bridge pass complete");
    total
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32) -> SlotValue {
        NaiveDate::from_ymd_opt(y, m, 1)
    }

    #[test]
    fn test_bridge_fills_between_equal_values() {
        let a = d(2020, 1);
        let mut row = vec![a, None, None, a, None];

        let filled = bridge_row(&mut row);

        assert_eq!(filled, 2);
        assert_eq!(row, vec![a, a, a, a, None]);
    }

    #[test]
    fn test_bridge_blocked_by_different_value() {
        let a = d(2020, 1);
        let b = d(2021, 6);
        let mut row = vec![a, None, b, None, a];

        let filled = bridge_row(&mut row);

        assert_eq!(filled, 0);
        assert_eq!(row, vec![a, None, b, None, a]);
    }

    #[test]
    fn test_bridge_chains_through_right_anchor() {
        let a = d(2020, 1);
        let mut row = vec![a, None, a, None, None, a];

        assert_eq!(bridge_row(&mut row), 3);
        assert_eq!(row, vec![a; 6]);
    }

    #[test]
    fn test_bridge_leading_and_trailing_gaps_untouched() {
        let a = d(2020, 1);
        let mut row = vec![None, a, None, a, None];

        bridge_row(&mut row);

        assert_eq!(row, vec![None, a, a, a, None]);
    }

    #[test]
    fn test_bridge_noop_on_sparse_rows() {
        let mut empty: Vec<SlotValue> = vec![None; 4];
        assert_eq!(bridge_row(&mut empty), 0);
        assert!(empty.iter().all(Option::is_none));

        let mut single = vec![None, d(2020, 5), None];
        assert_eq!(bridge_row(&mut single), 0);
        assert_eq!(single, vec![None, d(2020, 5), None]);

        let mut nothing: Vec<SlotValue> = Vec::new();
        assert_eq!(bridge_row(&mut nothing), 0);
    }

    #[test]
    fn test_bridge_adjacent_equal_values_fill_nothing() {
        let a = d(2020, 1);
        let mut row = vec![a, a, None, d(2020, 2)];

        assert_eq!(bridge_row(&mut row), 0);
    }
}
