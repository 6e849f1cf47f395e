//! Column-oriented aggregation of flattened records
//!
//! Columns are index-aligned: position *i* of every column is the *i*-th input
//! record. A record that lacks a key holds the missing marker (`None`) in that
//! column, whether the key appeared before or after it. Every column therefore
//! has exactly `row_count()` cells.

use std::collections::BTreeMap;

use serde_json::Value;

use super::flatten::flatten;

/// One cell of a column; `None` marks a record that did not contain the key
pub type Cell = Option<Value>;

/// Index-aligned sparse column store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStore {
    columns: BTreeMap<String, Vec<Cell>>,
    rows: usize,
}

impl ColumnStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten `record` and append it as the next row
    pub fn push_record(&mut self, record: &Value) {
        let row = self.rows;

        for (key, value) in flatten(record) {
            // Back-fill rows that predate the first appearance of this key
            let column = self
                .columns
                .entry(key)
                .or_insert_with(|| vec![None; row]);
            column.push(Some(value));
        }

        // Pad every column this record did not touch
        for column in self.columns.values_mut() {
            if column.len() == row {
                column.push(None);
            }
        }

        self.rows += 1;
    }

    /// Number of records aggregated
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of distinct columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when no record has been aggregated
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Cells of a column, if any record contained the key
    pub fn column(&self, key: &str) -> Option<&[Cell]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    /// True if any record contained the key
    pub fn contains(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    /// Column names in lexical order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Aggregate records, in order, into an index-aligned column store
pub fn aggregate<'a, I>(records: I) -> ColumnStore
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut store = ColumnStore::new();
    for record in records {
        store.push_record(record);
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_yields_empty_store() {
        let store = aggregate(std::iter::empty());
        assert!(store.is_empty());
        assert_eq!(store.column_count(), 0);
        assert_eq!(store.row_count(), 0);
    }

    #[test]
    fn test_sparse_keys_are_index_aligned() {
        let records = [json!({"a": {"b": 1}}), json!({"a": {"c": 2}})];
        let store = aggregate(&records);

        assert_eq!(store.row_count(), 2);
        assert_eq!(store.column("a.b").unwrap(), &[Some(json!(1)), None]);
        assert_eq!(store.column("a.c").unwrap(), &[None, Some(json!(2))]);
    }

    #[test]
    fn test_every_column_has_row_count_cells() {
        let records = [
            json!({"x": 1}),
            json!({}),
            json!({"y": {"z": true}}),
            json!({"x": 4, "w": "late"}),
        ];
        let store = aggregate(&records);

        assert_eq!(store.row_count(), 4);
        for key in store.keys() {
            assert_eq!(store.column(key).unwrap().len(), 4, "column {}", key);
        }
        assert_eq!(
            store.column("x").unwrap(),
            &[Some(json!(1)), None, None, Some(json!(4))]
        );
        assert_eq!(
            store.column("w").unwrap(),
            &[None, None, None, Some(json!("late"))]
        );
    }

    #[test]
    fn test_explicit_null_differs_from_missing() {
        let records = [json!({"k": null}), json!({"other": 1})];
        let store = aggregate(&records);
        assert_eq!(store.column("k").unwrap(), &[Some(Value::Null), None]);
    }

    #[test]
    fn test_unknown_column() {
        let store = aggregate(&[json!({"a": 1})]);
        assert!(store.column("b").is_none());
        assert!(!store.contains("b"));
        assert!(store.contains("a"));
    }
}
