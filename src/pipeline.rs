// 🔁 Pipeline - compose fill and review passes in a caller-chosen order
//
// Every pass mutates the same matrix in place. The pipeline only sequences
// them and collects a report; it adds no semantics of its own.

use crate::config::PipelineConfig;
use crate::error::FillError;
use crate::fill::{bridge_equal_neighbors, decide_gaps, propagate_right};
use crate::matrix::{AgreementMatrix, Highlight, Status};
use crate::review::{flag_revisions, mark_complete};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::info;

// ============================================================================
// STEP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Equal-neighbor bridge
    Bridge,
    /// Right propagator
    Propagate,
    /// Nearest-neighbor decider
    Decide,
    /// Completion marker
    Complete,
    /// Revision flagger
    Revisions,
}

impl Step {
    pub fn default_order() -> Vec<Step> {
        vec![
            Step::Bridge,
            Step::Propagate,
            Step::Decide,
            Step::Complete,
            Step::Revisions,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Bridge => "bridge",
            Step::Propagate => "propagate",
            Step::Decide => "decide",
            Step::Complete => "complete",
            Step::Revisions => "revisions",
        }
    }

    /// Parse a comma-separated list such as `bridge,propagate,decide`
    pub fn parse_list(list: &str) -> Result<Vec<Step>, FillError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }

    /// Apply this pass to the matrix
    pub fn apply(&self, matrix: &mut AgreementMatrix, max_run: usize) -> StepReport {
        let mut report = StepReport::new(*self);

        match self {
            Step::Bridge => report.cells_filled = bridge_equal_neighbors(matrix),
            Step::Propagate => report.cells_filled = propagate_right(matrix),
            Step::Decide => report.cells_filled = decide_gaps(matrix),
            Step::Complete => report.rows_marked = mark_complete(matrix),
            Step::Revisions => {
                let before = matrix.count_status(Status::Review);
                report.highlights = flag_revisions(matrix, max_run);
                report.rows_marked = matrix.count_status(Status::Review) - before;
            }
        }

        report
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = FillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bridge" | "same_left_right" => Ok(Step::Bridge),
            "propagate" | "propagate_right" => Ok(Step::Propagate),
            "decide" | "choose" => Ok(Step::Decide),
            "complete" | "done" | "mark_done" => Ok(Step::Complete),
            "revisions" | "revision" | "flag" => Ok(Step::Revisions),
            other => Err(FillError::UnknownStep(other.to_string())),
        }
    }
}

// ============================================================================
// REPORTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: Step,
    pub cells_filled: usize,
    pub rows_marked: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub highlights: Vec<Highlight>,
}

impl StepReport {
    fn new(step: Step) -> Self {
        StepReport {
            step,
            cells_filled: 0,
            rows_marked: 0,
            highlights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows: usize,
    pub slots: usize,
    pub input_fingerprint: String,
    pub output_fingerprint: String,
    pub steps: Vec<StepReport>,
    pub done_rows: usize,
    pub review_rows: usize,
    pub unset_rows: usize,
    /// Union of every revision pass, deduplicated, ordered by (row, slot)
    pub highlights: Vec<Highlight>,
}

impl RunReport {
    pub fn cells_filled(&self) -> usize {
        self.steps.iter().map(|s| s.cells_filled).sum()
    }

    pub fn changed(&self) -> bool {
        self.input_fingerprint != self.output_fingerprint
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows x {} slots: {} cells filled | {} done, {} need review, {} unset | {} highlighted cells",
            self.rows,
            self.slots,
            self.cells_filled(),
            self.done_rows,
            self.review_rows,
            self.unset_rows,
            self.highlights.len()
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every configured step in order against the matrix
    pub fn run(&self, matrix: &mut AgreementMatrix) -> RunReport {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let input_fingerprint = matrix.fingerprint();

        info!(
            run_id = %run_id,
            rows = matrix.rows(),
            slots = matrix.width(),
            steps = ?self.config.steps,
            "starting run"
        );

        let mut highlights = BTreeSet::new();
        let mut steps = Vec::with_capacity(self.config.steps.len());

        for step in &self.config.steps {
            let report = step.apply(matrix, self.config.max_run);
            highlights.extend(report.highlights.iter().copied());
            steps.push(report);
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            rows: matrix.rows(),
            slots: matrix.width(),
            input_fingerprint,
            output_fingerprint: matrix.fingerprint(),
            steps,
            done_rows: matrix.count_status(Status::Done),
            review_rows: matrix.count_status(Status::Review),
            unset_rows: matrix.count_status(Status::Unset),
            highlights: highlights.into_iter().collect(),
        };

        info!(run_id = %report.run_id, "{}", report.summary());
        report
    }

    /// Owned form of [`Pipeline::run`]: matrix in, matrix and report out
    pub fn apply(&self, mut matrix: AgreementMatrix) -> (AgreementMatrix, RunReport) {
        let report = self.run(&mut matrix);
        (matrix, report)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
