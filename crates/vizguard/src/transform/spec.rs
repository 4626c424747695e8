//! Transform specifications and their resolved operations.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VizguardError};

/// A single named transform as supplied by a caller.
///
/// Parameters are operation-specific; unused ones are ignored. The spec is
/// resolved once into an [`Operation`] before any data is touched, so a
/// malformed spec fails before partial work happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformSpec {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<i64>,
}

impl TransformSpec {
    /// Parse one spec from a JSON value, e.g. an element of a
    /// caller-supplied transform list.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| {
            VizguardError::InvalidTransform(format!("Invalid transform spec: {e}"))
        })
    }
}

/// Resampling period. Unknown frequency codes are rejected outright rather
/// than passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freq {
    Monthly,
    Weekly,
    Daily,
}

impl Freq {
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "M" => Ok(Freq::Monthly),
            "W" => Ok(Freq::Weekly),
            "D" => Ok(Freq::Daily),
            other => Err(VizguardError::InvalidTransform(format!(
                "Unsupported resample freq '{other}'. Supported: M,W,D"
            ))),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Freq::Monthly => "M",
            Freq::Weekly => "W",
            Freq::Daily => "D",
        }
    }
}

/// Aggregation applied to every numeric column during resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Mean,
    Sum,
    Median,
    First,
    Last,
}

impl Agg {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "mean" => Ok(Agg::Mean),
            "sum" => Ok(Agg::Sum),
            "median" => Ok(Agg::Median),
            "first" => Ok(Agg::First),
            "last" => Ok(Agg::Last),
            _ => Err(VizguardError::InvalidTransform(
                "Unsupported agg for resample. Supported: mean,sum,median,first,last".to_string(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Agg::Mean => "mean",
            Agg::Sum => "sum",
            Agg::Median => "median",
            Agg::First => "first",
            Agg::Last => "last",
        }
    }
}

/// A fully validated operation ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    MovingAverage { field: String, window: usize },
    RebasedIndex { field: String, base: f64 },
    Resample { freq: Freq, agg: Agg },
    PctChange { field: String, periods: usize },
}

impl Operation {
    /// Resolve a raw spec into an operation, validating parameters.
    pub fn from_spec(spec: &TransformSpec) -> Result<Self> {
        match spec.op.as_str() {
            "moving_average" => {
                let field = required_field(spec, "moving_average")?;
                let window = spec.window.unwrap_or(1);
                if window <= 0 {
                    return Err(VizguardError::InvalidTransform(
                        "moving_average window must be >0".to_string(),
                    ));
                }
                Ok(Operation::MovingAverage {
                    field,
                    window: window as usize,
                })
            }
            "rebased_index" => {
                let field = required_field(spec, "rebased_index")?;
                Ok(Operation::RebasedIndex {
                    field,
                    base: spec.base.unwrap_or(100.0),
                })
            }
            "resample" => {
                let freq = Freq::from_code(spec.freq.as_deref().unwrap_or("M"))?;
                let agg = Agg::from_name(spec.agg.as_deref().unwrap_or("mean"))?;
                Ok(Operation::Resample { freq, agg })
            }
            "pct_change" => {
                let field = required_field(spec, "pct_change")?;
                let periods = spec.periods.unwrap_or(1);
                if periods <= 0 {
                    return Err(VizguardError::InvalidTransform(
                        "pct_change periods must be >0".to_string(),
                    ));
                }
                Ok(Operation::PctChange {
                    field,
                    periods: periods as usize,
                })
            }
            other => Err(VizguardError::InvalidTransform(format!(
                "Unsupported transform op: {other}"
            ))),
        }
    }

    /// Deterministic provenance label recorded after a successful run.
    pub fn label(&self) -> String {
        match self {
            Operation::MovingAverage { field, window } => {
                format!("moving_average_{field}_w{window}")
            }
            Operation::RebasedIndex { field, base } => {
                format!("rebased_index_{field}_base{}", *base as i64)
            }
            Operation::Resample { freq, agg } => {
                format!("resample_{}_agg_{}", freq.code(), agg.name())
            }
            Operation::PctChange { field, periods } => {
                format!("pct_change_{field}_p{periods}")
            }
        }
    }
}

fn required_field(spec: &TransformSpec, op: &str) -> Result<String> {
    match spec.field.as_deref() {
        Some(f) if !f.is_empty() => Ok(f.to_string()),
        _ => Err(VizguardError::InvalidTransform(format!(
            "{op} requires a 'field' parameter"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(op: &str) -> TransformSpec {
        TransformSpec {
            op: op.to_string(),
            field: Some("Close".to_string()),
            window: None,
            base: None,
            freq: None,
            agg: None,
            periods: None,
        }
    }

    #[test]
    fn test_unknown_op_rejected() {
        let err = Operation::from_spec(&spec("interpolate")).unwrap_err();
        assert!(matches!(err, VizguardError::InvalidTransform(_)));
    }

    #[test]
    fn test_defaults_applied() {
        let op = Operation::from_spec(&spec("pct_change")).unwrap();
        assert_eq!(
            op,
            Operation::PctChange {
                field: "Close".to_string(),
                periods: 1
            }
        );

        let op = Operation::from_spec(&spec("resample")).unwrap();
        assert_eq!(
            op,
            Operation::Resample {
                freq: Freq::Monthly,
                agg: Agg::Mean
            }
        );
    }

    #[test]
    fn test_unknown_freq_rejected() {
        let mut s = spec("resample");
        s.freq = Some("Q".to_string());
        assert!(Operation::from_spec(&s).is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut s = spec("moving_average");
        s.window = Some(0);
        assert!(Operation::from_spec(&s).is_err());
    }

    #[test]
    fn test_labels() {
        let mut s = spec("moving_average");
        s.window = Some(30);
        assert_eq!(
            Operation::from_spec(&s).unwrap().label(),
            "moving_average_Close_w30"
        );

        let mut s = spec("rebased_index");
        s.base = Some(100.0);
        assert_eq!(
            Operation::from_spec(&s).unwrap().label(),
            "rebased_index_Close_base100"
        );
    }

    #[test]
    fn test_spec_deserializes_from_json() {
        let s: TransformSpec =
            serde_json::from_value(serde_json::json!({"op": "moving_average", "field": "Close", "window": 30}))
                .unwrap();
        assert_eq!(s.op, "moving_average");
        assert_eq!(s.window, Some(30));
    }
}
