//! Per-KPI evaluation of prediction columns against ground-truth columns
//!
//! For each KPI `k` the evaluator pairs `k.score` (prediction) with `k.gt`
//! (ground truth), normalizes both, keeps the rows where neither side is
//! Unset, and scores what is left. Each KPI is independent: a missing column
//! or an empty filter result for one KPI never affects another.
//!
//! The averaging mode is chosen from the first kept row only. When both the
//! first truth and the first prediction are booleans the KPI is scored as a
//! binary problem with True as the positive class; any other combination
//! falls back to weighted multi-class averaging. A binary KPI whose later
//! rows carry class ids other than 0 and 1 is reported as
//! [`KpiOutcome::NonBinaryLabels`] instead of being scored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::columns::ColumnStore;
use super::metrics::{self, Averaging, KpiMetrics};
use super::normalize::{normalize_column, CanonicalValue};
use super::{GROUND_TRUTH_SUFFIX, PREDICTION_SUFFIX};

/// Result of evaluating one KPI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KpiOutcome {
    /// Metrics computed over the rows where both sides were set
    Scored(KpiMetrics),
    /// The prediction or ground-truth column does not exist
    MissingColumn { column: String },
    /// Both columns exist but no row had a usable value on both sides
    NoValidData,
    /// The first row selected binary scoring but other rows hold these
    /// class ids (sorted)
    NonBinaryLabels { classes: Vec<i64> },
}

impl KpiOutcome {
    pub fn metrics(&self) -> Option<&KpiMetrics> {
        match self {
            KpiOutcome::Scored(metrics) => Some(metrics),
            _ => None,
        }
    }
}

/// One KPI and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub kpi: String,
    pub outcome: KpiOutcome,
}

/// Outcomes for every requested KPI, in request order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub results: Vec<KpiResult>,
}

impl EvaluationReport {
    /// Outcome of a KPI by name (first occurrence)
    pub fn get(&self, kpi: &str) -> Option<&KpiOutcome> {
        self.results
            .iter()
            .find(|result| result.kpi == kpi)
            .map(|result| &result.outcome)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of KPIs that produced metrics
    pub fn scored_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome.metrics().is_some())
            .count()
    }
}

/// Evaluate every KPI against the store
pub fn evaluate<S: AsRef<str>>(store: &ColumnStore, kpis: &[S]) -> EvaluationReport {
    let results = kpis
        .iter()
        .map(|kpi| {
            let kpi = kpi.as_ref();
            KpiResult {
                kpi: kpi.to_string(),
                outcome: evaluate_kpi(store, kpi),
            }
        })
        .collect();

    EvaluationReport { results }
}

/// Evaluate a single KPI
pub fn evaluate_kpi(store: &ColumnStore, kpi: &str) -> KpiOutcome {
    let prediction_key = format!("{}{}", kpi, PREDICTION_SUFFIX);
    let truth_key = format!("{}{}", kpi, GROUND_TRUTH_SUFFIX);

    let predictions = match store.column(&prediction_key) {
        Some(column) => column,
        None => {
            debug!(kpi = %kpi, column = %prediction_key, "Prediction column not found");
            return KpiOutcome::MissingColumn {
                column: prediction_key,
            };
        }
    };
    let truths = match store.column(&truth_key) {
        Some(column) => column,
        None => {
            debug!(kpi = %kpi, column = %truth_key, "Ground-truth column not found");
            return KpiOutcome::MissingColumn { column: truth_key };
        }
    };

    let predictions = normalize_column(predictions);
    let truths = normalize_column(truths);

    let kept: Vec<(CanonicalValue, CanonicalValue)> = truths
        .into_iter()
        .zip(predictions)
        .filter(|(truth, predicted)| !truth.is_unset() && !predicted.is_unset())
        .collect();

    let Some(&(first_truth, first_prediction)) = kept.first() else {
        debug!(kpi = %kpi, "No rows with both values set");
        return KpiOutcome::NoValidData;
    };

    let averaging = select_averaging(first_truth, first_prediction);

    // Unset rows are already filtered out, so every value has a class id
    let (truth_ids, predicted_ids): (Vec<i64>, Vec<i64>) = kept
        .iter()
        .filter_map(|(truth, predicted)| Some((truth.class_id()?, predicted.class_id()?)))
        .unzip();

    if averaging == Averaging::Binary {
        let classes: BTreeSet<i64> = truth_ids
            .iter()
            .chain(&predicted_ids)
            .copied()
            .filter(|class| *class != 0 && *class != 1)
            .collect();
        if !classes.is_empty() {
            debug!(kpi = %kpi, classes = ?classes, "Binary KPI holds other classes");
            return KpiOutcome::NonBinaryLabels {
                classes: classes.into_iter().collect(),
            };
        }
    }

    let result = metrics::compute(&truth_ids, &predicted_ids, averaging);
    debug!(
        kpi = %kpi,
        rows = result.support,
        averaging = ?averaging,
        accuracy = result.accuracy,
        "KPI scored"
    );
    KpiOutcome::Scored(result)
}

/// Pick the averaging mode from the first kept row
fn select_averaging(first_truth: CanonicalValue, first_prediction: CanonicalValue) -> Averaging {
    if first_truth.is_boolean() && first_prediction.is_boolean() {
        Averaging::Binary
    } else {
        Averaging::Weighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::columns::aggregate;
    use serde_json::{json, Value};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    fn rows(pairs: &[(Value, Value)]) -> ColumnStore {
        let records: Vec<Value> = pairs
            .iter()
            .map(|(predicted, truth)| json!({"k.score": predicted, "k.gt": truth}))
            .collect();
        aggregate(&records)
    }

    #[test]
    fn test_binary_accuracy() {
        let store = rows(&[
            (json!(true), json!(true)),
            (json!(false), json!(false)),
            (json!(false), json!(true)),
        ]);
        let outcome = evaluate_kpi(&store, "k");
        let metrics = outcome.metrics().expect("scored");

        assert!(close(metrics.accuracy, 0.667));
        assert_eq!(metrics.averaging, Averaging::Binary);
        assert!(close(metrics.precision, 1.0));
        assert!(close(metrics.f1, 0.667));
    }

    #[test]
    fn test_mixed_representations_normalize_to_binary() {
        let store = rows(&[
            (json!("Yes"), json!(1.0)),
            (json!("no"), json!("No")),
            (json!("1"), json!(true)),
        ]);
        let metrics = evaluate_kpi(&store, "k").metrics().cloned().unwrap();
        assert_eq!(metrics.averaging, Averaging::Binary);
        assert_eq!(metrics.accuracy, 1.0);
    }

    #[test]
    fn test_missing_column_does_not_block_other_kpis() {
        let store = aggregate(&[json!({"a.score": true, "a.gt": true, "b.score": true})]);
        let report = evaluate(&store, &["a", "b", "c"]);

        assert_eq!(report.results.len(), 3);
        assert!(report.get("a").unwrap().metrics().is_some());
        assert_eq!(
            report.get("b"),
            Some(&KpiOutcome::MissingColumn {
                column: "b.gt".to_string()
            })
        );
        assert_eq!(
            report.get("c"),
            Some(&KpiOutcome::MissingColumn {
                column: "c.score".to_string()
            })
        );
        assert_eq!(report.scored_count(), 1);
    }

    #[test]
    fn test_all_unset_is_no_valid_data() {
        let store = rows(&[
            (json!("maybe"), json!(true)),
            (json!(true), Value::Null),
            (json!(0.5), json!("unknown")),
        ]);
        assert_eq!(evaluate_kpi(&store, "k"), KpiOutcome::NoValidData);
    }

    #[test]
    fn test_row_filter_is_per_kpi() {
        let records = [
            json!({"a.score": true, "a.gt": true, "b.score": "??", "b.gt": true}),
            json!({"a.score": false, "a.gt": true, "b.score": true, "b.gt": true}),
        ];
        let store = aggregate(&records);
        let report = evaluate(&store, &["a", "b"]);

        assert_eq!(report.get("a").unwrap().metrics().unwrap().support, 2);
        assert_eq!(report.get("b").unwrap().metrics().unwrap().support, 1);
    }

    #[test]
    fn test_integer_first_row_selects_weighted() {
        let store = rows(&[
            (json!(1), json!(true)),
            (json!(true), json!(true)),
            (json!(false), json!(false)),
        ]);
        let metrics = evaluate_kpi(&store, "k").metrics().cloned().unwrap();
        // Integer 1 and True share class 1, so every row agrees
        assert_eq!(metrics.averaging, Averaging::Weighted);
        assert_eq!(metrics.accuracy, 1.0);
    }

    #[test]
    fn test_binary_first_row_with_other_classes_is_not_scored() {
        let store = rows(&[
            (json!(true), json!(true)),
            (json!(3), json!(2)),
            (json!(false), json!(3)),
        ]);
        assert_eq!(
            evaluate_kpi(&store, "k"),
            KpiOutcome::NonBinaryLabels {
                classes: vec![2, 3]
            }
        );
    }

    #[test]
    fn test_non_binary_labels_isolated_per_kpi() {
        let records = [
            json!({"a.score": true, "a.gt": true, "b.score": true, "b.gt": true}),
            json!({"a.score": 5, "a.gt": true, "b.score": false, "b.gt": false}),
        ];
        let store = aggregate(&records);
        let report = evaluate(&store, &["a", "b"]);

        assert_eq!(
            report.get("a"),
            Some(&KpiOutcome::NonBinaryLabels { classes: vec![5] })
        );
        assert_eq!(report.get("b").unwrap().metrics().unwrap().accuracy, 1.0);
        assert_eq!(report.scored_count(), 1);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["results"][0]["outcome"]["status"], "non_binary_labels");
        assert_eq!(value["results"][0]["outcome"]["classes"], json!([5]));
    }

    #[test]
    fn test_weighted_first_row_accepts_any_classes() {
        let store = rows(&[
            (json!(2), json!(2)),
            (json!(true), json!(true)),
            (json!(3), json!(2)),
        ]);
        let metrics = evaluate_kpi(&store, "k").metrics().cloned().unwrap();
        assert_eq!(metrics.averaging, Averaging::Weighted);
        assert!(close(metrics.accuracy, 0.667));
    }

    #[test]
    fn test_missing_cells_from_sparse_records_are_dropped() {
        let records = [
            json!({"k.score": true}),
            json!({"k.gt": false}),
            json!({"k.score": false, "k.gt": false}),
        ];
        let store = aggregate(&records);
        let metrics = evaluate_kpi(&store, "k").metrics().cloned().unwrap();
        assert_eq!(metrics.support, 1);
    }

    #[test]
    fn test_empty_kpi_list_gives_empty_report() {
        let store = rows(&[(json!(true), json!(true))]);
        let report = evaluate::<&str>(&store, &[]);
        assert!(report.is_empty());
    }

    #[test]
    fn test_report_serializes_with_status_tag() {
        let store = rows(&[(json!(true), json!(true))]);
        let report = evaluate(&store, &["k", "x"]);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["results"][0]["kpi"], "k");
        assert_eq!(value["results"][0]["outcome"]["status"], "scored");
        assert_eq!(value["results"][0]["outcome"]["averaging"], "binary");
        assert_eq!(value["results"][1]["outcome"]["status"], "missing_column");
        assert_eq!(value["results"][1]["outcome"]["column"], "x.score");
    }
}
