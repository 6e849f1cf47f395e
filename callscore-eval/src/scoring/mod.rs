//! Scoring pipeline
//!
//! Turns LLM analysis records and human ground-truth records into per-KPI
//! classification metrics:
//!
//! ```text
//! merge (analysis + ground truth) → flatten → aggregate (ColumnStore)
//!     → normalize (per evaluated column) → evaluate (per KPI)
//! ```
//!
//! Every stage is a pure function over in-memory values. Nothing here does I/O;
//! records are supplied by a [`crate::loader::RecordLoader`].

pub mod columns;
pub mod evaluator;
pub mod flatten;
pub mod merge;
pub mod metrics;
pub mod normalize;

pub use columns::{aggregate, Cell, ColumnStore};
pub use evaluator::{evaluate, evaluate_kpi, EvaluationReport, KpiOutcome, KpiResult};
pub use flatten::{flatten, flatten_with};
pub use merge::merge_records;
pub use metrics::{Averaging, KpiMetrics};
pub use normalize::{normalize, CanonicalValue};

/// Suffix of prediction columns produced by the analysis (`<KPI>.score`)
pub const PREDICTION_SUFFIX: &str = ".score";

/// Suffix given to ground-truth columns when merged (`<KPI>.gt`)
pub const GROUND_TRUTH_SUFFIX: &str = ".gt";
