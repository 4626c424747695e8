//! Generic traversal over JSON value trees.

use serde_json::Value;

/// Visit every string in the tree; when the visitor returns a replacement,
/// the string is rewritten in place. Arrays and objects are descended
/// recursively, all other values are left untouched.
pub fn rewrite_strings<F>(value: &mut Value, visit: &mut F)
where
    F: FnMut(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            if let Some(replacement) = visit(s) {
                *s = replacement;
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_strings(item, visit);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                rewrite_strings(v, visit);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rewrites_nested_strings() {
        let mut value = json!({
            "a": "keep",
            "b": {"c": ["drop", 1, null, {"d": "drop"}]},
        });
        rewrite_strings(&mut value, &mut |s| (s == "drop").then(String::new));
        assert_eq!(
            value,
            json!({"a": "keep", "b": {"c": ["", 1, null, {"d": ""}]}})
        );
    }

    #[test]
    fn test_leaves_non_strings_alone() {
        let mut value = json!({"n": 1.5, "b": true});
        rewrite_strings(&mut value, &mut |_| Some("x".to_string()));
        assert_eq!(value, json!({"n": 1.5, "b": true}));
    }
}
