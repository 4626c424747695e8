//! Best-effort spec sanitization.
//!
//! The sanitizer is not a rejection gate: it always returns a cleaned copy
//! plus a report of what it found and removed. Deciding to reject belongs to
//! the validator.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use super::config::GrammarConfig;
use super::walk::rewrite_strings;

/// Injection-style payloads an untrusted generator might embed.
const DANGEROUS_PATTERNS: &[&str] = &[
    r"function\s*\(",
    r"<\s*script",
    r"eval\s*\(",
    r"window\.",
    r"document\.",
    r"__proto__",
    r"constructor\s*\(",
    r"new\s+Function",
    r"data:\s*image/",
    r"javascript\s*:",
    r"<\s*iframe",
];

static DANGEROUS_RE: Lazy<Regex> = Lazy::new(|| {
    let joined = DANGEROUS_PATTERNS
        .iter()
        .map(|p| format!("({p})"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){joined}")).expect("dangerous pattern set must compile")
});

/// What the sanitizer found and changed.
///
/// `forbidden_matches` reflects the original spec, before any stripping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanitizationReport {
    pub removed_top_keys: Vec<String>,
    pub sanitized_fields: Vec<String>,
    pub forbidden_matches: Vec<String>,
    pub inline_data_trimmed: Option<String>,
}

/// Scan the serialized spec for dangerous substrings; distinct matches,
/// sorted.
pub fn find_forbidden_matches(spec: &Value) -> Vec<String> {
    let serialized = spec.to_string();
    let matches: BTreeSet<String> = DANGEROUS_RE
        .find_iter(&serialized)
        .map(|m| m.as_str().to_string())
        .collect();
    matches.into_iter().collect()
}

/// Produce a sanitized copy of the spec and a report of every change.
///
/// Never fails; a non-object input comes back unchanged with
/// `forbidden_matches = ["spec_not_json"]`.
pub fn sanitize(spec: &Value, config: &GrammarConfig) -> (Value, SanitizationReport) {
    let mut report = SanitizationReport::default();

    let Some(original) = spec.as_object() else {
        report.forbidden_matches = vec!["spec_not_json".to_string()];
        return (spec.clone(), report);
    };

    // 1) Detect on the original spec, before any stripping.
    report.forbidden_matches = find_forbidden_matches(spec);

    // 2) Remove forbidden top-level keys.
    let mut clean = original.clone();
    for key in &config.forbidden_keys {
        if clean.remove(key).is_some() {
            report.removed_top_keys.push(key.clone());
        }
    }

    // 3) Scrub matched substrings out of title and description in place.
    for field in ["title", "description"] {
        let cleaned = match clean.get(field) {
            Some(Value::String(text)) if DANGEROUS_RE.is_match(text) => {
                Some(DANGEROUS_RE.replace_all(text, "").into_owned())
            }
            _ => None,
        };
        if let Some(cleaned) = cleaned {
            clean.insert(field.to_string(), Value::String(cleaned));
            report.sanitized_fields.push(field.to_string());
        }
    }

    // 4) Trim oversized inline data.
    if let Some(values) = clean
        .get("data")
        .and_then(|d| d.get("values"))
        .and_then(Value::as_array)
    {
        let n = values.len();
        if n > config.max_preview_rows {
            let trimmed: Vec<Value> = values[..config.max_preview_rows].to_vec();
            clean.insert(
                "data".to_string(),
                serde_json::json!({ "values": trimmed }),
            );
            report.inline_data_trimmed = Some(format!(
                "Inline data reduced from {n} to {} rows for safety.",
                config.max_preview_rows
            ));
        }
    }

    // 5) Blank out data-URI / javascript: strings anywhere in the tree.
    let mut value = Value::Object(clean);
    rewrite_strings(&mut value, &mut |s| {
        let lower = s.to_lowercase();
        (lower.contains("data:image") || lower.contains("javascript:")).then(String::new)
    });

    (value, report)
}
