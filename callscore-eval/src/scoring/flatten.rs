//! Nested record flattening
//!
//! `{"greeting": {"score": true, "reason": "..."}}` becomes
//! `{"greeting.score": true, "greeting.reason": "..."}`.
//! Arrays and all other non-object values are leaves and pass through unchanged.

use serde_json::{Map, Value};

/// Separator used between path segments
pub const DEFAULT_SEPARATOR: &str = ".";

/// Flatten a record with no prefix and the default `.` separator
pub fn flatten(record: &Value) -> Map<String, Value> {
    flatten_with(record, "", DEFAULT_SEPARATOR)
}

/// Flatten a record, joining nested keys onto `prefix` with `separator`
///
/// Key order follows the input record. A non-object input has no fields and
/// flattens to an empty map.
pub fn flatten_with(record: &Value, prefix: &str, separator: &str) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(fields) = record {
        flatten_into(fields, prefix, separator, &mut out);
    }
    out
}

fn flatten_into(
    fields: &Map<String, Value>,
    prefix: &str,
    separator: &str,
    out: &mut Map<String, Value>,
) {
    for (key, value) in fields {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, separator, key)
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &path, separator, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_record_unchanged() {
        let record = json!({"a": 1, "b": "two", "c": null, "d": [1, 2]});
        assert_eq!(Value::Object(flatten(&record)), record);
    }

    #[test]
    fn test_one_level_nesting() {
        let record = json!({
            "greeting": {"score": true, "reason": "said hello"},
            "closing": {"score": "No"},
            "agent": "Dana"
        });
        let flat = flatten(&record);

        assert_eq!(flat.len(), 4);
        assert_eq!(flat["greeting.score"], json!(true));
        assert_eq!(flat["greeting.reason"], json!("said hello"));
        assert_eq!(flat["closing.score"], json!("No"));
        assert_eq!(flat["agent"], json!("Dana"));
    }

    #[test]
    fn test_key_order_preserved() {
        let record = json!({"z": {"b": 1, "a": 2}, "m": 3});
        let flat = flatten(&record);
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z.b", "z.a", "m"]);
    }

    #[test]
    fn test_arrays_are_leaves() {
        let record = json!({"tags": [{"x": 1}], "outer": {"list": []}});
        let flat = flatten(&record);
        assert_eq!(flat["tags"], json!([{"x": 1}]));
        assert_eq!(flat["outer.list"], json!([]));
    }

    #[test]
    fn test_deep_nesting_and_custom_separator() {
        let record = json!({"a": {"b": {"c": 1}}});
        assert_eq!(flatten(&record)["a.b.c"], json!(1));

        let flat = flatten_with(&record, "root", "/");
        assert_eq!(flat["root/a/b/c"], json!(1));
    }

    #[test]
    fn test_empty_and_non_object_input() {
        assert!(flatten(&json!({})).is_empty());
        assert!(flatten(&json!([1, 2, 3])).is_empty());
        assert!(flatten(&json!({"empty": {}})).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let record = json!({"a": {"b": 1, "c": {"d": false}}, "e": "x"});
        let once = Value::Object(flatten(&record));
        let twice = Value::Object(flatten(&once));
        assert_eq!(once, twice);
    }
}
