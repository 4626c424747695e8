//! Data quality checks and deterministic autofixes.

mod engine;
mod report;

pub use engine::{DownsampleMethod, QualityConfig, QualityEngine};
pub use report::{ColumnNanStats, Issue, IssueCode, OutlierStats, QualityMetrics, QualityReport};
