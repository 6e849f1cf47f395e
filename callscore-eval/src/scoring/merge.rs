//! Merging an analysis record with its ground truth
//!
//! Ground-truth fields are renamed with the `.gt` suffix so they never collide
//! with the analysis fields (which flatten to `<KPI>.score`). The call id field
//! of the ground truth identifies the record and is never scored.

use serde_json::{Map, Value};

use super::GROUND_TRUTH_SUFFIX;

/// Name of the call id column in ground-truth uploads
pub const CALL_ID_FIELD: &str = "Call ID";

/// True if `key` names the call id field (case-insensitive, surrounding
/// whitespace ignored)
pub fn is_call_id_key(key: &str) -> bool {
    key.trim().eq_ignore_ascii_case(CALL_ID_FIELD)
}

/// Merge one analysis record with its (optional) ground truth
///
/// Analysis fields are copied verbatim. Each ground-truth field except the
/// call id is added as `<field>.gt`. Non-object inputs contribute no fields.
pub fn merge_records(analysis: &Value, ground_truth: Option<&Value>) -> Value {
    let mut merged = match analysis {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };

    if let Some(Value::Object(truth)) = ground_truth {
        for (key, value) in truth {
            if is_call_id_key(key) {
                continue;
            }
            merged.insert(format!("{}{}", key, GROUND_TRUTH_SUFFIX), value.clone());
        }
    }

    Value::Object(merged)
}
