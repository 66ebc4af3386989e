// 🔍 Revision Flagger
//
// An agreement that appears for only a handful of consecutive months is
// probably a revision or a data-entry slip rather than a real contract.
// Every slot of such a run is highlighted and the row is marked "?".
//
// Adjacent short runs of different values are flagged independently; they
// are never merged into one longer run.

use crate::matrix::{AgreementMatrix, Highlight, SlotValue, Status};
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::{debug, info};

/// Longest run (in months) still considered suspiciously short
pub const DEFAULT_MAX_RUN: usize = 4;

/// Maximal runs of one identical value whose length is in `1..=max_run`
pub fn short_runs(row: &[SlotValue], max_run: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;

    while start < row.len() {
        let Some(value) = row[start] else {
            start += 1;
            continue;
        };

        let mut end = start + 1;
        while end < row.len() && row[end] == Some(value) {
            end += 1;
        }

        if end - start <= max_run {
            runs.push(start..end);
        }
        start = end;
    }

    runs
}

/// Flag short runs in every row.
///
/// Returns the deduplicated highlight coordinates ordered by (row, slot).
/// Rows with at least one short run settle to "?" unless already labeled.
pub fn flag_revisions(matrix: &mut AgreementMatrix, max_run: usize) -> Vec<Highlight> {
    let mut highlights = BTreeSet::new();
    let mut flagged_rows = 0;

    for row in 0..matrix.rows() {
        let (values, entity) = matrix.row_with_entity_mut(row);
        let runs = short_runs(values, max_run);
        if runs.is_empty() {
            continue;
        }

        flagged_rows += 1;
        if !entity.status.settle(Status::Review) && entity.status != Status::Review {
            debug!(
                row,
                account = %entity.account_id,
                status = %entity.status,
                "short run found on an already settled row"
            );
        }

        for run in runs {
            highlights.extend(run.map(|slot| Highlight::new(row, slot)));
        }
    }

    info!(
        flagged_rows,
        highlighted = highlights.len(),
        max_run,
        "revision pass complete"
    );
    highlights.into_iter().collect()
}

/// Owned form of [`flag_revisions`]: matrix in, matrix and coordinates out
pub fn apply_revisions(
    mut matrix: AgreementMatrix,
    max_run: usize,
) -> (AgreementMatrix, Vec<Highlight>) {
    let highlights = flag_revisions(&mut matrix, max_run);
    (matrix, highlights)
}

// ============================================================================
// TESTS
// ============================================================================
