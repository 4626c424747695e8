//! Cell values and date parsing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single cell in a table row.
///
/// Coercion failures are structural data: a value that cannot be read as a
/// number becomes `Null`, never a swallowed error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing or unconvertible value.
    Null,
    /// Numeric value (all numbers are carried as f64).
    Number(f64),
    /// Free-text value.
    Text(String),
}

impl CellValue {
    /// Convert a JSON value into a cell, coercing where sensible.
    ///
    /// Booleans become 0/1 to match numeric coercion; arrays and objects
    /// have no tabular meaning and become `Null`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
            Value::Array(_) | Value::Object(_) => CellValue::Null,
        }
    }

    /// Render the cell back to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Number(n) if n.is_finite() => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Number(_) => Value::Null,
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Read the cell as a number, parsing numeric-looking text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Null => None,
        }
    }

    /// Read the cell as a calendar date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Parse a calendar date from common textual layouts.
///
/// Accepts ISO dates, slash variants, US dates, and the date prefix of an
/// RFC3339 timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    // Timestamp prefix, e.g. "2025-01-01T00:00:00Z"
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }
    None
}

/// Format a date the way every table carries it after normalization.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
