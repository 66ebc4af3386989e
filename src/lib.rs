// Agreement Fill - Core Library
// Exposes all modules for use in the CLI, the review TUI, and tests

pub mod config;
pub mod error;
pub mod fill;     // Gap-filling passes: bridge, propagate, decide
pub mod loader;
pub mod matrix;
pub mod month;
pub mod pipeline;
pub mod review;   // Completion marker + revision flagger
pub mod writer;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use config::{LayoutConfig, PipelineConfig, DEFAULT_HIGHLIGHT_COLOR};
pub use error::{FillError, Result};
pub use fill::{
    bridge_equal_neighbors, bridge_row, decide_gaps, decide_row, propagate_right, propagate_row,
};
pub use loader::{load_csv, load_path, matrix_from_table, read_csv, RawCell};
#[cfg(feature = "xlsx")]
pub use loader::load_xlsx;
pub use matrix::{AgreementMatrix, EntityRow, Highlight, SlotValue, Status};
pub use month::{format_date, from_excel_serial, parse_date, Month, DEFAULT_DATE_FORMAT};
pub use pipeline::{Pipeline, RunReport, Step, StepReport};
pub use review::{
    apply_revisions, flag_revisions, is_complete, mark_complete, short_runs, DEFAULT_MAX_RUN,
};
pub use writer::{
    highlight_records, save_csv, save_highlights_json, save_path, write_csv, HighlightRecord,
};
#[cfg(feature = "xlsx")]
pub use writer::save_xlsx;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
