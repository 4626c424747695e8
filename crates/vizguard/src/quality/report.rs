//! Quality report types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Machine-readable finding codes, matching the wire codes consumed by
/// downstream retry loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    #[serde(rename = "E_TOO_MANY_POINTS")]
    TooManyPoints,
    #[serde(rename = "E_MISSING_MANY")]
    MissingMany,
    #[serde(rename = "E_NON_MONOTONIC_DATES")]
    NonMonotonicDates,
    #[serde(rename = "E_OUTLIER_DETECTED")]
    OutlierDetected,
    #[serde(rename = "E_BAD_DATA")]
    BadData,
    #[serde(rename = "W_NO_DATE_COLUMN")]
    NoDateColumn,
    #[serde(rename = "W_MISSING_MANY")]
    MissingSome,
    #[serde(rename = "W_FLAT_SERIES")]
    FlatSeries,
}

/// A single quality finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Missing-value stats for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnNanStats {
    pub n_na: usize,
    pub ratio: f64,
}

/// Outlier stats for one column: count plus the IQR fence used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierStats {
    pub n_outliers: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Diagnostic metrics gathered during a check pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub n_rows: usize,
    pub nan_info: IndexMap<String, ColumnNanStats>,
    pub numeric_cols: Vec<String>,
    pub outliers: IndexMap<String, OutlierStats>,
}

/// Outcome of a quality check pass.
///
/// Invariant: `ok == errors.is_empty()`. Warnings never affect `ok`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub ok: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub metrics: QualityMetrics,
}

impl QualityReport {
    pub fn from_findings(
        errors: Vec<Issue>,
        warnings: Vec<Issue>,
        metrics: QualityMetrics,
    ) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
            warnings,
            metrics,
        }
    }

    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: IssueCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_tracks_errors() {
        let clean = QualityReport::from_findings(vec![], vec![], QualityMetrics::default());
        assert!(clean.ok);

        let broken = QualityReport::from_findings(
            vec![Issue::new(IssueCode::BadData, "bad")],
            vec![],
            QualityMetrics::default(),
        );
        assert!(!broken.ok);
    }

    #[test]
    fn test_codes_serialize_to_wire_names() {
        let json = serde_json::to_string(&IssueCode::TooManyPoints).unwrap();
        assert_eq!(json, "\"E_TOO_MANY_POINTS\"");
        let json = serde_json::to_string(&IssueCode::FlatSeries).unwrap();
        assert_eq!(json, "\"W_FLAT_SERIES\"");
    }
}
