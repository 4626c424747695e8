//! Vizguard: integrity and output-safety gate for chart pipelines.
//!
//! Vizguard sits between an untrusted spec generator (typically an LLM) and
//! a chart renderer. It strips injection payloads from generated specs,
//! enforces a closed visualization grammar, cross-checks field references
//! against the data actually being charted, runs statistical quality checks,
//! and applies deterministic corrective transforms when data exceeds
//! operating limits.
//!
//! # Core Principles
//!
//! - **Pure**: every operation is a synchronous function over immutable
//!   inputs; no I/O, no shared state, no ambient configuration
//! - **Deterministic**: corrective fixes are reproducible given the same
//!   input and config; nothing is interpolated or invented
//! - **Complete verdicts**: findings are aggregated, so one bad column or
//!   one forbidden pattern never hides the rest
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use vizguard::{QualityConfig, QualityEngine, SpecValidator, Table};
//!
//! let table = Table::from_values(&[
//!     json!({"date": "2025-01-01", "Close": 100.0}),
//!     json!({"date": "2025-01-02", "Close": 101.0}),
//! ]);
//!
//! let quality = QualityEngine::new();
//! let report = quality.check(&table, &QualityConfig::default());
//! println!("data ok: {}", report.ok);
//!
//! let spec = json!({
//!     "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
//!     "data": {"values": []},
//!     "mark": "line",
//!     "encoding": {
//!         "x": {"field": "date", "type": "temporal"},
//!         "y": {"field": "Close", "type": "quantitative"},
//!     },
//! });
//! let verdict = SpecValidator::new().validate(&spec, &table, None);
//! println!("spec valid: {}", verdict.valid);
//! ```

pub mod error;
pub mod quality;
pub mod spec;
pub mod table;
pub mod transform;

pub use error::{Result, VizguardError};
pub use quality::{
    DownsampleMethod, Issue, IssueCode, QualityConfig, QualityEngine, QualityMetrics,
    QualityReport,
};
pub use spec::{GrammarConfig, SanitizationReport, SpecValidator, ValidationResult, sanitize};
pub use table::{CellValue, Row, Table};
pub use transform::{TransformEngine, TransformSpec};
