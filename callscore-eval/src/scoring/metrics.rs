//! Classification metrics over integer class ids
//!
//! # Averaging
//! - **Binary**: precision/recall/F1 of the positive class only (class 1, i.e. True)
//! - **Weighted**: per-class precision/recall/F1 averaged with each class
//!   weighted by its support in the truth column
//!
//! A class with no predicted positives has precision 0; a class with no true
//! positives and no misses has recall 0. F1 is 0 whenever precision and recall
//! are both 0. No computation divides by zero.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Positive class for binary averaging (True)
pub const POSITIVE_CLASS: i64 = 1;

/// How per-class scores are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Averaging {
    Binary,
    Weighted,
}

/// Metrics for one KPI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Rows scored after filtering out unset values
    pub support: usize,
    pub averaging: Averaging,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ClassScores {
    precision: f64,
    recall: f64,
    f1: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Confusion {
    fn for_class(truth: &[i64], predicted: &[i64], class: i64) -> Self {
        let mut counts = Confusion::default();
        for (t, p) in truth.iter().zip(predicted) {
            match (*t == class, *p == class) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }

    fn scores(&self) -> ClassScores {
        let precision = ratio(self.tp, self.tp + self.fp);
        let recall = ratio(self.tp, self.tp + self.fn_);
        let f1 = ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_);
        ClassScores {
            precision,
            recall,
            f1,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Fraction of rows where prediction equals truth
pub fn accuracy(truth: &[i64], predicted: &[i64]) -> f64 {
    let matches = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    ratio(matches, truth.len().min(predicted.len()))
}

fn binary_scores(truth: &[i64], predicted: &[i64]) -> ClassScores {
    Confusion::for_class(truth, predicted, POSITIVE_CLASS).scores()
}

fn weighted_scores(truth: &[i64], predicted: &[i64]) -> ClassScores {
    let classes: BTreeSet<i64> = truth.iter().chain(predicted).copied().collect();
    let total = truth.len();
    if total == 0 {
        return ClassScores::default();
    }

    let mut weighted = ClassScores::default();
    for class in classes {
        let support = truth.iter().filter(|t| **t == class).count();
        if support == 0 {
            continue;
        }
        let weight = support as f64 / total as f64;
        let scores = Confusion::for_class(truth, predicted, class).scores();
        weighted.precision += weight * scores.precision;
        weighted.recall += weight * scores.recall;
        weighted.f1 += weight * scores.f1;
    }
    weighted
}

/// Compute accuracy, precision, recall and F1 for paired class ids
///
/// `truth` and `predicted` are expected to have equal length; extra trailing
/// entries of the longer slice are ignored.
pub fn compute(truth: &[i64], predicted: &[i64], averaging: Averaging) -> KpiMetrics {
    let rows = truth.len().min(predicted.len());
    let (truth, predicted) = (&truth[..rows], &predicted[..rows]);

    let scores = match averaging {
        Averaging::Binary => binary_scores(truth, predicted),
        Averaging::Weighted => weighted_scores(truth, predicted),
    };

    KpiMetrics {
        accuracy: accuracy(truth, predicted),
        precision: scores.precision,
        recall: scores.recall,
        f1: scores.f1,
        support: rows,
        averaging,
    }
}
