//! Statistical quality checks and deterministic autofixes.

use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::transform::{Agg, Freq, TransformEngine, TransformSpec};

use super::report::{ColumnNanStats, Issue, IssueCode, OutlierStats, QualityMetrics, QualityReport};

/// Thresholds and settings for quality checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Hard ceiling on rows a chart may render.
    pub max_render_rows: usize,
    /// Ceiling on preview rows handed to the validator.
    pub preview_row_limit: usize,
    /// Maximum tolerated null ratio per column.
    pub max_nan_ratio: f64,
    /// IQR multiplier for outlier fences.
    pub outlier_iqr_multiplier: f64,
    /// Outlier detection only runs at or above this row count.
    pub min_rows_for_outlier_detection: usize,
    /// Whether autofix may downsample.
    pub allow_autofix_downsample: bool,
    /// How autofix reduces row counts.
    pub downsample_method: DownsampleMethod,
    /// Aggregation used by monthly resampling.
    pub resample_agg: String,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_render_rows: 5000,
            preview_row_limit: 50,
            max_nan_ratio: 0.2,
            outlier_iqr_multiplier: 3.0,
            min_rows_for_outlier_detection: 6,
            allow_autofix_downsample: true,
            downsample_method: DownsampleMethod::Decimate,
            resample_agg: "mean".to_string(),
        }
    }
}

/// Downsampling strategy for autofix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownsampleMethod {
    Decimate,
    AggregateMonthly,
}

/// Runs quality checks and deterministic corrections.
///
/// `check` never mutates its input; `autofix` returns a fresh table along
/// with an action log and the re-run reports for each corrective step.
pub struct QualityEngine;

impl QualityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all checks in fixed order. Checks never short-circuit each other,
    /// so one bad column cannot hide the rest.
    pub fn check(&self, table: &Table, config: &QualityConfig) -> QualityReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut metrics = QualityMetrics::default();

        let n_rows = table.row_count();
        metrics.n_rows = n_rows;

        if n_rows == 0 {
            errors.push(Issue::new(IssueCode::BadData, "No data rows provided."));
            return QualityReport::from_findings(errors, warnings, metrics);
        }

        let fields = table.field_names();

        // 1) Row count ceiling
        if n_rows > config.max_render_rows {
            errors.push(Issue::new(
                IssueCode::TooManyPoints,
                format!(
                    "Data has {n_rows} rows which exceeds the max allowed {}.",
                    config.max_render_rows
                ),
            ));
        }

        // 2) Date validity and ordering
        if fields.iter().any(|f| f == "date") {
            let dates = table.date_column();
            if dates.iter().any(Option::is_none) {
                errors.push(Issue::new(
                    IssueCode::BadData,
                    "One or more date values could not be parsed (null).",
                ));
            } else if dates.windows(2).any(|pair| pair[0] >= pair[1]) {
                warnings.push(Issue::new(
                    IssueCode::NonMonotonicDates,
                    "Date column not strictly increasing. Consider sorting rows by date before charting.",
                ));
            }
        } else {
            warnings.push(Issue::new(
                IssueCode::NoDateColumn,
                "No 'date' column present in data.",
            ));
        }

        // 3) Missing values per column
        for col in fields.iter().filter(|c| *c != "date") {
            let n_na = table
                .rows
                .iter()
                .filter(|row| row.get(col).map(|c| c.is_null()).unwrap_or(true))
                .count();
            let ratio = n_na as f64 / n_rows as f64;
            metrics
                .nan_info
                .insert(col.clone(), ColumnNanStats { n_na, ratio });
            if ratio > config.max_nan_ratio {
                errors.push(Issue::new(
                    IssueCode::MissingMany,
                    format!(
                        "Column '{col}' has {n_na}/{n_rows} missing values (ratio {ratio:.2}) which exceeds allowed {:.2}.",
                        config.max_nan_ratio
                    ),
                ));
            } else if ratio > config.max_nan_ratio / 2.0 {
                warnings.push(Issue::new(
                    IssueCode::MissingSome,
                    format!("Column '{col}' has {n_na}/{n_rows} missing values (ratio {ratio:.2})."),
                ));
            }
        }

        let numeric_cols: Vec<String> = fields
            .iter()
            .filter(|c| *c != "date" && table.is_numeric_column(c))
            .cloned()
            .collect();
        metrics.numeric_cols = numeric_cols.clone();

        // 4) IQR outlier detection (informational, never an error)
        if n_rows >= config.min_rows_for_outlier_detection {
            for col in &numeric_cols {
                let mut values: Vec<f64> =
                    table.numeric_column(col).into_iter().flatten().collect();
                if values.is_empty() {
                    continue;
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let q1 = quantile(&values, 0.25);
                let q3 = quantile(&values, 0.75);
                let iqr = q3 - q1;
                if iqr == 0.0 {
                    continue;
                }
                let lower = q1 - config.outlier_iqr_multiplier * iqr;
                let upper = q3 + config.outlier_iqr_multiplier * iqr;
                let n_outliers = values.iter().filter(|v| **v < lower || **v > upper).count();
                if n_outliers > 0 {
                    metrics.outliers.insert(
                        col.clone(),
                        OutlierStats {
                            n_outliers,
                            lower,
                            upper,
                        },
                    );
                    warnings.push(Issue::new(
                        IssueCode::OutlierDetected,
                        format!(
                            "Column '{col}' has {n_outliers} outlier(s) outside [{lower:.3}, {upper:.3}]."
                        ),
                    ));
                }
            }
        }

        // 5) Flat series detection
        for col in &numeric_cols {
            let mut values: Vec<f64> = table.numeric_column(col).into_iter().flatten().collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();
            if values.len() <= 1 {
                warnings.push(Issue::new(
                    IssueCode::FlatSeries,
                    format!("Column '{col}' appears constant or near-constant."),
                ));
            }
        }

        QualityReport::from_findings(errors, warnings, metrics)
    }

    /// Attempt deterministic corrections (downsampling only).
    ///
    /// The initial check report is always recorded; every corrective action
    /// appends its own re-run report so callers can see whether the fix
    /// actually brought the data within limits.
    pub fn autofix(
        &self,
        table: &Table,
        config: &QualityConfig,
    ) -> (Table, Vec<String>, Vec<QualityReport>) {
        let mut actions = Vec::new();
        let mut reports = vec![self.check(table, config)];

        let n_rows = table.row_count();
        let max_rows = config.max_render_rows.max(1);
        if n_rows <= max_rows || !config.allow_autofix_downsample {
            return (table.clone(), actions, reports);
        }

        if config.downsample_method == DownsampleMethod::AggregateMonthly {
            // Invalid aggregation names fall back to mean, and any resample
            // failure falls through to decimation.
            let agg = Agg::from_name(&config.resample_agg).unwrap_or(Agg::Mean);
            if let Some(fixed) = self.aggregate_monthly(table, agg) {
                actions.push(format!("resample_monthly_agg_{}", agg.name()));
                reports.push(self.check(&fixed, config));
                return (fixed, actions, reports);
            }
        }

        // Decimation: keep every k-th row by original index. Deterministic
        // and order-preserving; the only data-loss-introducing path.
        let k = n_rows.div_ceil(max_rows);
        if k <= 1 {
            return (table.clone(), actions, reports);
        }
        let mut rows: Vec<_> = table.rows.iter().step_by(k).cloned().collect();
        rows.truncate(max_rows);
        let kept = rows.len();
        let fixed = Table::new(rows);

        actions.push(format!("decimate_every_{k}_kept_{kept}_rows"));
        reports.push(self.check(&fixed, config));
        (fixed, actions, reports)
    }

    // Route through the transform engine so the fix shares the exact
    // resampling semantics callers get from explicit transforms.
    fn aggregate_monthly(&self, table: &Table, agg: Agg) -> Option<Table> {
        let spec = TransformSpec {
            op: "resample".to_string(),
            field: None,
            window: None,
            base: None,
            freq: Some(Freq::Monthly.code().to_string()),
            agg: Some(agg.name().to_string()),
            periods: None,
        };
        TransformEngine::new()
            .apply(table, &[spec])
            .ok()
            .map(|(fixed, _)| fixed)
    }
}

impl Default for QualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear-interpolated quantile over a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;
    use serde_json::json;

    fn make_rows(n: usize) -> Table {
        let base = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let values: Vec<_> = (0..n)
            .map(|i| {
                let d = base + chrono::Days::new(i as u64);
                json!({
                    "date": d.format("%Y-%m-%d").to_string(),
                    "Close": 100.0 + i as f64,
                    "Volume": 1000.0 + i as f64 * 10.0,
                })
            })
            .collect();
        Table::from_values(&values)
    }

    #[test]
    fn test_too_many_points_detected() {
        let config = QualityConfig {
            max_render_rows: 5000,
            allow_autofix_downsample: false,
            ..QualityConfig::default()
        };
        let report = QualityEngine::new().check(&make_rows(12000), &config);
        assert!(!report.ok);
        assert!(report.has_error(IssueCode::TooManyPoints));
    }

    #[test]
    fn test_missing_values_detected() {
        let mut table = make_rows(10);
        for row in table.rows.iter_mut().take(6) {
            row.insert("Close".to_string(), CellValue::Null);
        }
        let config = QualityConfig {
            max_nan_ratio: 0.5,
            ..QualityConfig::default()
        };
        let report = QualityEngine::new().check(&table, &config);
        assert!(!report.ok);
        assert!(report.has_error(IssueCode::MissingMany));
        assert_eq!(report.metrics.nan_info["Close"].n_na, 6);
    }

    #[test]
    fn test_half_threshold_warns_only() {
        let mut table = make_rows(10);
        for row in table.rows.iter_mut().take(3) {
            row.insert("Close".to_string(), CellValue::Null);
        }
        let config = QualityConfig {
            max_nan_ratio: 0.5,
            ..QualityConfig::default()
        };
        let report = QualityEngine::new().check(&table, &config);
        assert!(report.ok);
        assert!(report.has_warning(IssueCode::MissingSome));
    }

    #[test]
    fn test_non_monotonic_dates_warns() {
        let table = Table::from_values(&[
            json!({"date": "2025-01-02", "Close": 101.0}),
            json!({"date": "2025-01-01", "Close": 100.0}),
            json!({"date": "2025-01-03", "Close": 102.0}),
        ]);
        let report = QualityEngine::new().check(&table, &QualityConfig::default());
        assert!(report.ok);
        assert!(report.has_warning(IssueCode::NonMonotonicDates));
    }

    #[test]
    fn test_duplicate_dates_break_strict_ordering() {
        let table = Table::from_values(&[
            json!({"date": "2025-01-01", "Close": 100.0}),
            json!({"date": "2025-01-01", "Close": 101.0}),
        ]);
        let report = QualityEngine::new().check(&table, &QualityConfig::default());
        assert!(report.has_warning(IssueCode::NonMonotonicDates));
    }

    #[test]
    fn test_unparseable_date_is_error() {
        let table = Table::from_values(&[
            json!({"date": "2025-01-01", "Close": 100.0}),
            json!({"date": "garbage", "Close": 101.0}),
        ]);
        let report = QualityEngine::new().check(&table, &QualityConfig::default());
        assert!(!report.ok);
        assert!(report.has_error(IssueCode::BadData));
    }

    #[test]
    fn test_no_date_column_warns() {
        let table = Table::from_values(&[json!({"Close": 100.0}), json!({"Close": 101.0})]);
        let report = QualityEngine::new().check(&table, &QualityConfig::default());
        assert!(report.has_warning(IssueCode::NoDateColumn));
    }

    #[test]
    fn test_outlier_detection_warns() {
        let mut table = make_rows(20);
        table.rows[10].insert("Close".to_string(), CellValue::Number(100000.0));
        let config = QualityConfig {
            min_rows_for_outlier_detection: 5,
            outlier_iqr_multiplier: 1.5,
            ..QualityConfig::default()
        };
        let report = QualityEngine::new().check(&table, &config);
        assert!(report.has_warning(IssueCode::OutlierDetected));
        assert_eq!(report.metrics.outliers["Close"].n_outliers, 1);
        // Outliers are informational only.
        assert!(report.ok);
    }

    #[test]
    fn test_outlier_detection_gated_by_row_count() {
        let mut table = make_rows(4);
        table.rows[2].insert("Close".to_string(), CellValue::Number(100000.0));
        let config = QualityConfig {
            min_rows_for_outlier_detection: 6,
            ..QualityConfig::default()
        };
        let report = QualityEngine::new().check(&table, &config);
        assert!(!report.has_warning(IssueCode::OutlierDetected));
    }

    #[test]
    fn test_flat_series_warns() {
        let table = Table::from_values(&[
            json!({"date": "2025-01-01", "Close": 5.0}),
            json!({"date": "2025-01-02", "Close": 5.0}),
            json!({"date": "2025-01-03", "Close": 5.0}),
        ]);
        let report = QualityEngine::new().check(&table, &QualityConfig::default());
        assert!(report.has_warning(IssueCode::FlatSeries));
    }

    #[test]
    fn test_empty_table_is_bad_data() {
        let report = QualityEngine::new().check(&Table::default(), &QualityConfig::default());
        assert!(!report.ok);
        assert!(report.has_error(IssueCode::BadData));
    }

    #[test]
    fn test_autofix_noop_within_limits() {
        let table = make_rows(100);
        let (fixed, actions, reports) =
            QualityEngine::new().autofix(&table, &QualityConfig::default());
        assert_eq!(fixed.row_count(), 100);
        assert!(actions.is_empty());
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_autofix_decimate_reduces_rows() {
        let table = make_rows(10000);
        let config = QualityConfig {
            max_render_rows: 1000,
            allow_autofix_downsample: true,
            downsample_method: DownsampleMethod::Decimate,
            ..QualityConfig::default()
        };
        let (fixed, actions, reports) = QualityEngine::new().autofix(&table, &config);
        assert!(fixed.row_count() <= config.max_render_rows);
        assert!(actions.iter().any(|a| a.starts_with("decimate_every")));
        // Initial report plus the post-fix report.
        assert_eq!(reports.len(), 2);
        assert!(!reports[1].has_error(IssueCode::TooManyPoints));
    }

    #[test]
    fn test_decimate_keeps_strided_rows() {
        let table = make_rows(10);
        let config = QualityConfig {
            max_render_rows: 5,
            ..QualityConfig::default()
        };
        let (fixed, _, _) = QualityEngine::new().autofix(&table, &config);
        // k = ceil(10/5) = 2: rows 0, 2, 4, 6, 8 survive.
        assert_eq!(fixed.row_count(), 5);
        for (i, row) in fixed.rows.iter().enumerate() {
            assert_eq!(row.get("Close"), Some(&CellValue::Number(100.0 + (i * 2) as f64)));
        }
    }

    #[test]
    fn test_autofix_resample_monthly() {
        let table = make_rows(180);
        let config = QualityConfig {
            max_render_rows: 10,
            allow_autofix_downsample: true,
            downsample_method: DownsampleMethod::AggregateMonthly,
            resample_agg: "mean".to_string(),
            ..QualityConfig::default()
        };
        let (fixed, actions, reports) = QualityEngine::new().autofix(&table, &config);
        assert!(fixed.row_count() <= 12);
        assert!(actions.iter().any(|a| a.starts_with("resample_monthly")));
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_aggregate_monthly_falls_back_to_decimate() {
        // Rows without a usable date cannot be resampled; decimation runs.
        let values: Vec<_> = (0..30).map(|i| json!({"Close": i as f64})).collect();
        let table = Table::from_values(&values);
        let config = QualityConfig {
            max_render_rows: 10,
            downsample_method: DownsampleMethod::AggregateMonthly,
            ..QualityConfig::default()
        };
        let (fixed, actions, _) = QualityEngine::new().autofix(&table, &config);
        assert!(fixed.row_count() <= 10);
        assert!(actions.iter().any(|a| a.starts_with("decimate_every")));
    }

    #[test]
    fn test_no_autofix_if_disabled() {
        let table = make_rows(10000);
        let config = QualityConfig {
            max_render_rows: 1000,
            allow_autofix_downsample: false,
            ..QualityConfig::default()
        };
        let (fixed, actions, _) = QualityEngine::new().autofix(&table, &config);
        assert_eq!(fixed.row_count(), table.row_count());
        assert!(actions.is_empty());
    }
}
