// ⚙️ Configuration - which passes run, in what order, and how output looks
//
// Loaded from a JSON file; every field has a default so a partial file (or
// no file at all) is fine. Command-line flags override file values.

use crate::error::Result;
use crate::month::DEFAULT_DATE_FORMAT;
use crate::pipeline::Step;
use crate::review::DEFAULT_MAX_RUN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default highlight fill (ARGB, opaque yellow)
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "FFFFFF00";

// ============================================================================
// LAYOUT
// ============================================================================

/// Column layout of the tabular source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Fixed columns before the first monthly slot
    /// (identifier, brand, monetary figure, cancellation date, entry count)
    pub leading_columns: usize,

    /// Header of the trailing status column, if present on input
    pub status_header: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            leading_columns: 5,
            status_header: "Status".to_string(),
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Passes to run, in order
    pub steps: Vec<Step>,

    /// Longest run still flagged for review
    pub max_run: usize,

    pub layout: LayoutConfig,

    /// chrono format for written slot values and labels
    pub date_format: String,

    /// ARGB fill applied to highlighted cells in spreadsheet output
    pub highlight_color: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            steps: Step::default_order(),
            max_run: DEFAULT_MAX_RUN,
            layout: LayoutConfig::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load config from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Replace the step list (e.g. from `--steps bridge,decide`)
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_max_run(mut self, max_run: usize) -> Self {
        self.max_run = max_run;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.steps, Step::default_order());
        assert_eq!(config.max_run, 4);
        assert_eq!(config.layout.leading_columns, 5);
        assert_eq!(config.layout.status_header, "Status");
        assert_eq!(config.date_format, "%m/%d/%Y");
        assert_eq!(config.highlight_color, "FFFFFF00");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "steps": ["decide", "complete"], "layout": { "leading_columns": 3 } }"#,
        )
        .unwrap();

        assert_eq!(config.steps, vec![Step::Decide, Step::Complete]);
        assert_eq!(config.layout.leading_columns, 3);
        assert_eq!(config.layout.status_header, "Status");
        assert_eq!(config.max_run, 4);
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        let result = PipelineConfig::from_json(r#"{ "steps": ["shuffle"] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_run": 2, "highlight_color": "FFFF0000" }}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();

        assert_eq!(config.max_run, 2);
        assert_eq!(config.highlight_color, "FFFF0000");
        assert_eq!(config.steps.len(), 5);
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::default()
            .with_steps(vec![Step::Bridge])
            .with_max_run(6);

        assert_eq!(config.steps, vec![Step::Bridge]);
        assert_eq!(config.max_run, 6);
    }
}
