// ✅ Completion Marker
//
// A row is done when its observed span (first to last non-absent slot) has
// no holes. A single observation has no span to validate.

use crate::matrix::{AgreementMatrix, SlotValue, Status};
use tracing::info;

/// True when the row has at least two observations and no gap between them
pub fn is_complete(row: &[SlotValue]) -> bool {
    let first = row.iter().position(Option::is_some);
    let last = row.iter().rposition(Option::is_some);

    match (first, last) {
        (Some(first), Some(last)) if first < last => {
            row[first..=last].iter().all(Option::is_some)
        }
        _ => false,
    }
}

/// Settle every complete row to "Done". Returns rows newly marked.
pub fn mark_complete(matrix: &mut AgreementMatrix) -> usize {
    let mut marked = 0;

    for row in 0..matrix.rows() {
        let (values, entity) = matrix.row_with_entity_mut(row);
        if is_complete(values) && entity.status.settle(Status::Done) {
            marked += 1;
        }
    }

    info!(
        marked,
        done = matrix.count_status(Status::Done),
        rows = matrix.rows(),
        "completion pass complete"
    );
    marked
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::EntityRow;
    use crate::month::Month;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32) -> SlotValue {
        NaiveDate::from_ymd_opt(y, m, 1)
    }

    fn matrix_with(rows: Vec<Vec<SlotValue>>) -> AgreementMatrix {
        let mut matrix = AgreementMatrix::for_months(
            Month::new(2021, 1).unwrap(),
            Month::new(2021, 5).unwrap(),
        );
        for (i, values) in rows.into_iter().enumerate() {
            matrix
                .push_row(EntityRow::new(&format!("acct-{}", i)), values)
                .unwrap();
        }
        matrix
    }

    #[test]
    fn test_is_complete_contiguous_span() {
        let a = d(2021, 1);
        assert!(is_complete(&[None, a, a, d(2021, 4), None]));
        assert!(is_complete(&[a, a]));
    }

    #[test]
    fn test_is_complete_rejects_holes_and_sparse_rows() {
        let a = d(2021, 1);
        assert!(!is_complete(&[a, None, a]));
        assert!(!is_complete(&[None, a, None]));
        assert!(!is_complete(&[None, None]));
        assert!(!is_complete(&[]));
    }

    #[test]
    fn test_mark_complete_sets_done() {
        let a = d(2021, 1);
        let mut matrix = matrix_with(vec![
            vec![a, a, a, None, None],
            vec![a, None, a, None, None],
            vec![None, None, a, None, None],
        ]);

        assert_eq!(mark_complete(&mut matrix), 1);
        assert_eq!(matrix.status(0), Status::Done);
        assert_eq!(matrix.status(1), Status::Unset);
        assert_eq!(matrix.status(2), Status::Unset);
    }

    #[test]
    fn test_mark_complete_is_idempotent() {
        let a = d(2021, 1);
        let mut matrix = matrix_with(vec![vec![a, a, a, a, a]]);

        assert_eq!(mark_complete(&mut matrix), 1);
        let snapshot = matrix.clone();

        assert_eq!(mark_complete(&mut matrix), 0);
        assert_eq!(matrix, snapshot);
        assert_eq!(matrix.status(0), Status::Done);
    }

    #[test]
    fn test_mark_complete_keeps_existing_review_label() {
        let a = d(2021, 1);
        let mut matrix = matrix_with(vec![vec![a, a, None, None, None]]);
        matrix.entity_mut(0).status = Status::Review;

        assert_eq!(mark_complete(&mut matrix), 0);
        assert_eq!(matrix.status(0), Status::Review);
    }
}
