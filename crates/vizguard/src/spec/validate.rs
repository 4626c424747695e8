//! Grammar validation for chart specs.
//!
//! Runs the sanitizer first, then checks structural conformance against the
//! allowed grammar and cross-checks every encoding field reference against
//! the preview table and transform-synthesized fields. All findings are
//! aggregated into one result so a generator retry loop sees every problem
//! at once.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::table::Table;

use super::config::GrammarConfig;
use super::sanitize::{SanitizationReport, find_forbidden_matches, sanitize};

/// Final verdict for a spec.
///
/// Invariant: `valid == errors.is_empty()`; warnings never block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub sanitization: SanitizationReport,
}

impl ValidationResult {
    fn from_findings(
        errors: Vec<String>,
        warnings: Vec<String>,
        sanitization: SanitizationReport,
    ) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            sanitization,
        }
    }
}

/// Structural shape of a spec, resolved once at validation entry.
#[derive(Clone, Copy)]
enum SpecShape<'a> {
    Flat,
    Layered(&'a [Value]),
}

impl<'a> SpecShape<'a> {
    fn resolve(spec: &'a Map<String, Value>) -> Self {
        match spec.get("layer").and_then(Value::as_array) {
            Some(layers) => SpecShape::Layered(layers),
            None => SpecShape::Flat,
        }
    }
}

/// Validates specs against the configured grammar.
pub struct SpecValidator {
    config: GrammarConfig,
}

impl SpecValidator {
    /// Create a validator with the default grammar.
    pub fn new() -> Self {
        Self::with_config(GrammarConfig::default())
    }

    pub fn with_config(config: GrammarConfig) -> Self {
        Self { config }
    }

    /// Validate a spec against the preview table.
    ///
    /// `max_rows` overrides the configured render-row ceiling for inline
    /// data; the preview ceiling always comes from the config.
    pub fn validate(
        &self,
        spec: &Value,
        preview: &Table,
        max_rows: Option<usize>,
    ) -> ValidationResult {
        if !spec.is_object() {
            return ValidationResult::from_findings(
                vec!["Spec must be a JSON object.".to_string()],
                Vec::new(),
                SanitizationReport {
                    forbidden_matches: vec!["spec_not_json".to_string()],
                    ..SanitizationReport::default()
                },
            );
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 0) Sanitize and fold the report into the verdict. Findings on the
        // original spec are hard failures; cleanup actions are warnings.
        let (clean, sanitization) = sanitize(spec, &self.config);
        if !sanitization.forbidden_matches.is_empty() {
            errors.push(format!(
                "Spec contains forbidden substrings: {:?}",
                sanitization.forbidden_matches
            ));
        }
        if let Some(ref message) = sanitization.inline_data_trimmed {
            warnings.push(message.clone());
        }
        if !sanitization.removed_top_keys.is_empty() {
            warnings.push(format!(
                "Removed top-level forbidden keys: {:?}",
                sanitization.removed_top_keys
            ));
        }

        let Some(clean_map) = clean.as_object() else {
            // Sanitization preserves objectness; reaching here means the
            // input was not an object after all.
            return ValidationResult::from_findings(
                vec!["Spec must be a JSON object.".to_string()],
                warnings,
                sanitization,
            );
        };

        // 1) Required top-level keys, checked on the sanitized spec.
        for key in &self.config.required_top_level {
            if !clean_map.contains_key(key) {
                errors.push(format!("Missing required top-level key: '{key}'."));
            }
        }

        // 2) Mark checks. Flat marks are enforced; layered specs get
        // latitude since sub-layers commonly use rules/text for annotation.
        let shape = SpecShape::resolve(clean_map);
        match shape {
            SpecShape::Flat => match resolve_mark(clean_map.get("mark")) {
                Some(mark) => {
                    if !self.mark_allowed(mark) {
                        errors.push(format!(
                            "Mark '{mark}' is not allowed. Allowed: {:?}",
                            self.config.allowed_marks
                        ));
                    }
                }
                None => errors.push(format!(
                    "Spec 'mark' must be a string or an object with 'type' (allowed marks: {:?}).",
                    self.config.allowed_marks
                )),
            },
            SpecShape::Layered(layers) => {
                for (i, layer) in layers.iter().enumerate() {
                    let Some(layer) = layer.as_object() else { continue };
                    if let Some(mark) = resolve_mark(layer.get("mark")) {
                        if !self.mark_allowed(mark) {
                            warnings.push(format!(
                                "Layer {i} mark '{mark}' not in standard set. Allowed: {:?}",
                                self.config.allowed_marks
                            ));
                        }
                    }
                }
            }
        }

        // 3) Known-fields set: preview columns plus transform outputs,
        // gathered at top level and per layer.
        let mut known_fields: IndexSet<String> = preview
            .rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        collect_transform_fields(clean_map, &mut known_fields);
        if let SpecShape::Layered(layers) = shape {
            for layer in layers {
                if let Some(layer) = layer.as_object() {
                    collect_transform_fields(layer, &mut known_fields);
                }
            }
        }
        let has_preview = !preview.rows.is_empty();

        // 4) Encoding checks.
        let encoding = clean_map.get("encoding").and_then(Value::as_object);
        match shape {
            SpecShape::Flat => match encoding {
                Some(encoding) => {
                    for channel in &self.config.encoding_required_fields {
                        if !encoding.contains_key(channel) {
                            errors.push(format!("Missing encoding.{channel} field."));
                        } else {
                            self.check_encoding_channel(
                                channel,
                                encoding,
                                "",
                                &known_fields,
                                has_preview,
                                false,
                                &mut errors,
                            );
                        }
                    }
                }
                None => errors.push("Spec must include an 'encoding' object.".to_string()),
            },
            SpecShape::Layered(_) => {
                // Only a shared top-level encoding is validated; per-layer
                // encodings routinely reference derived fields.
                if let Some(encoding) = encoding {
                    for channel in &self.config.encoding_required_fields {
                        if encoding.contains_key(channel) {
                            self.check_encoding_channel(
                                channel,
                                encoding,
                                "shared ",
                                &known_fields,
                                has_preview,
                                true,
                                &mut errors,
                            );
                        }
                    }
                }
            }
        }

        // 5) Row-volume checks, independent of each other.
        if preview.row_count() > self.config.max_preview_rows {
            errors.push(format!(
                "data_preview has {} rows which exceeds allowed preview limit {}.",
                preview.row_count(),
                self.config.max_preview_rows
            ));
        }
        let inline_len = clean_map
            .get("data")
            .and_then(|d| d.get("values"))
            .and_then(Value::as_array)
            .map(|v| v.len())
            .unwrap_or(0);
        let effective_max_rows = max_rows.unwrap_or(self.config.max_render_rows);
        if inline_len > effective_max_rows {
            errors.push(format!(
                "Spec includes {inline_len} data rows which exceeds max allowed {effective_max_rows}."
            ));
        }

        // 6) Post-sanitization re-scan catches patterns surviving partial
        // cleanup (e.g. reassembled title fragments).
        let survivors = find_forbidden_matches(&clean);
        if !survivors.is_empty() {
            errors.push(format!(
                "Spec still contains forbidden patterns after sanitization: {survivors:?}"
            ));
        }

        ValidationResult::from_findings(errors, warnings, sanitization)
    }

    fn mark_allowed(&self, mark: &str) -> bool {
        self.config.allowed_marks.iter().any(|m| m == mark)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_encoding_channel(
        &self,
        channel: &str,
        encoding: &Map<String, Value>,
        context: &str,
        known_fields: &IndexSet<String>,
        has_preview: bool,
        layered: bool,
        errors: &mut Vec<String>,
    ) {
        let Some(enc) = encoding.get(channel).and_then(Value::as_object) else {
            errors.push(format!(
                "{context}encoding.{channel} must be an object with at least 'field' and 'type'."
            ));
            return;
        };

        let field = match enc.get("field").and_then(Value::as_str) {
            Some(f) if !f.is_empty() => f,
            _ => {
                errors.push(format!(
                    "{context}encoding.{channel}.field must be a non-empty string."
                ));
                return;
            }
        };

        if has_preview {
            let matched = known_fields
                .iter()
                .find(|known| known.eq_ignore_ascii_case(field));
            match matched {
                None => {
                    // Layered specs are expected to reference derived fields.
                    if !layered {
                        let mut fields: Vec<&String> = known_fields.iter().collect();
                        fields.sort();
                        errors.push(format!(
                            "{context}encoding.{channel}.field '{field}' not found in data preview fields: {fields:?}."
                        ));
                    }
                }
                Some(actual) => {
                    if channel == "x" {
                        if let Some(t) = enc.get("type").and_then(Value::as_str) {
                            if t != "temporal" && actual.eq_ignore_ascii_case("date") {
                                errors.push(format!(
                                    "{context}encoding.x.field '{field}' looks like a date but encoding.x.type is '{t}'. Use 'temporal'."
                                ));
                            }
                        }
                    }
                }
            }
        }

        if !enc.contains_key("type") {
            errors.push(format!(
                "{context}encoding.{channel}.type is required (e.g., 'temporal', 'quantitative')."
            ));
        }
    }
}

impl Default for SpecValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a mark declaration: either a bare string or `{type: "..."}`.
fn resolve_mark(mark: Option<&Value>) -> Option<&str> {
    match mark {
        Some(Value::String(s)) => Some(s),
        Some(Value::Object(o)) => o.get("type").and_then(Value::as_str),
        _ => None,
    }
}

/// Add fields synthesized by declared transforms to the known set:
/// `as` clauses of calculate-style transforms, window outputs, and fold
/// key/value names.
fn collect_transform_fields(spec: &Map<String, Value>, fields: &mut IndexSet<String>) {
    let Some(transforms) = spec.get("transform").and_then(Value::as_array) else {
        return;
    };
    for transform in transforms {
        let Some(transform) = transform.as_object() else { continue };

        match transform.get("as") {
            Some(Value::String(name)) => {
                fields.insert(name.clone());
            }
            Some(Value::Array(names)) => {
                for name in names {
                    if let Some(name) = name.as_str() {
                        fields.insert(name.to_string());
                    }
                }
            }
            _ => {}
        }

        if let Some(windows) = transform.get("window").and_then(Value::as_array) {
            for window in windows {
                if let Some(name) = window.get("as").and_then(Value::as_str) {
                    fields.insert(name.to_string());
                }
            }
        }

        if transform.contains_key("fold") {
            let as_names = transform.get("as").and_then(Value::as_array);
            let key = as_names
                .and_then(|a| a.first())
                .and_then(Value::as_str)
                .unwrap_or("key");
            let value = as_names
                .and_then(|a| a.get(1))
                .and_then(Value::as_str)
                .unwrap_or("value");
            fields.insert(key.to_string());
            fields.insert(value.to_string());
        }
    }
}
