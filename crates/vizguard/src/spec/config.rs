//! Grammar configuration for spec validation.

use serde::{Deserialize, Serialize};

/// The closed visualization grammar plus sizing limits.
///
/// Loaded once by the host (typically from a JSON allowlist file) and passed
/// by reference into every call; the core never reads ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Mark types a spec may use.
    pub allowed_marks: Vec<String>,
    /// Top-level keys every spec must carry.
    pub required_top_level: Vec<String>,
    /// Encoding channels a flat spec must define.
    pub encoding_required_fields: Vec<String>,
    /// Top-level keys stripped by the sanitizer (signal/event carriers).
    pub forbidden_keys: Vec<String>,
    /// Ceiling on preview rows and inline-data rows after sanitization.
    pub max_preview_rows: usize,
    /// Default render-row ceiling when the caller supplies none.
    pub max_render_rows: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            allowed_marks: [
                "line", "area", "bar", "point", "rect", "rule", "text", "tick", "circle",
                "square",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            required_top_level: vec!["$schema".to_string(), "data".to_string()],
            encoding_required_fields: vec!["x".to_string(), "y".to_string()],
            forbidden_keys: vec!["usermeta".to_string(), "signals".to_string()],
            max_preview_rows: 50,
            max_render_rows: 5000,
        }
    }
}
