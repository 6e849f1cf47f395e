//! Canonicalization of heterogeneous KPI values
//!
//! Ground truth and LLM output disagree on representation: booleans, 1/0,
//! "Yes"/"No", float artifacts from spreadsheet import. This is the only place
//! those representations are reconciled.
//!
//! # Decision table (first match wins)
//! 1. Boolean → unchanged
//! 2. Integer → unchanged ([`CanonicalValue::Integer`]), never coerced to a boolean
//! 3. Float → `1.0` True, `0.0` False, anything else Unset
//! 4. String → trimmed, lowercased: `yes`/`true` True, `no`/`false` False,
//!    else integer parse `1` True, `0` False, else Unset
//! 5. Anything else → JSON text, then the string rule without the integer parse
//!
//! Rules 2 and 4 are deliberately asymmetric: the string `"1"` becomes True
//! while the integer `1` stays an integer class.

use serde::Serialize;
use serde_json::Value;

use super::columns::Cell;

/// Canonical form of a KPI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalValue {
    True,
    False,
    /// Integer passed through untouched (rule 2)
    Integer(i64),
    /// Unknown or unparseable; rows holding it are not scored
    Unset,
}

impl CanonicalValue {
    pub fn from_bool(value: bool) -> Self {
        if value {
            CanonicalValue::True
        } else {
            CanonicalValue::False
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, CanonicalValue::Unset)
    }

    /// True for `True`/`False` only; integers are not boolean-typed
    pub fn is_boolean(&self) -> bool {
        matches!(self, CanonicalValue::True | CanonicalValue::False)
    }

    /// Class identifier used when comparing values
    ///
    /// Booleans share the integer class space (True is class 1, False class 0),
    /// so an integer 1 and a boolean True compare equal.
    pub fn class_id(&self) -> Option<i64> {
        match self {
            CanonicalValue::True => Some(1),
            CanonicalValue::False => Some(0),
            CanonicalValue::Integer(n) => Some(*n),
            CanonicalValue::Unset => None,
        }
    }
}

/// Normalize one raw value
pub fn normalize(value: &Value) -> CanonicalValue {
    match value {
        Value::Bool(b) => CanonicalValue::from_bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CanonicalValue::Integer(i)
            } else {
                // u64 beyond i64 range lands here too and is never 0 or 1
                match n.as_f64() {
                    Some(f) if f == 1.0 => CanonicalValue::True,
                    Some(f) if f == 0.0 => CanonicalValue::False,
                    _ => CanonicalValue::Unset,
                }
            }
        }
        Value::String(s) => normalize_text(s, true),
        other => normalize_text(&other.to_string(), false),
    }
}

/// Normalize one column cell; the missing marker is Unset
pub fn normalize_cell(cell: &Cell) -> CanonicalValue {
    cell.as_ref().map_or(CanonicalValue::Unset, normalize)
}

/// Normalize a whole column element-wise
pub fn normalize_column(cells: &[Cell]) -> Vec<CanonicalValue> {
    cells.iter().map(normalize_cell).collect()
}

fn normalize_text(raw: &str, parse_integers: bool) -> CanonicalValue {
    let text = raw.trim().to_lowercase();
    match text.as_str() {
        "yes" | "true" => return CanonicalValue::True,
        "no" | "false" => return CanonicalValue::False,
        _ => {}
    }

    if parse_integers {
        match text.parse::<i64>() {
            Ok(1) => return CanonicalValue::True,
            Ok(0) => return CanonicalValue::False,
            _ => {}
        }
    }

    CanonicalValue::Unset
}
