//! Service modules around the scoring pipeline
//!
//! - `evaluation`: load, merge and score one persona
//! - `ground_truth_import`: CSV or XLSX upload to per-call ground-truth records
//! - `batch_analysis`: bounded worker pool running the LLM analysis
//! - `personas`: KPI list edits

pub mod batch_analysis;
pub mod evaluation;
pub mod ground_truth_import;
pub mod personas;

pub use batch_analysis::{
    run_batch, strip_json_fence, Analyzer, BatchOutcome, TaskFailure, DEFAULT_WORKERS,
};
pub use evaluation::{evaluate_persona, PersonaEvaluation, SkippedRecord};
pub use ground_truth_import::{
    import_ground_truth, import_ground_truth_csv, import_ground_truth_xlsx,
    parse_ground_truth_csv, parse_ground_truth_xlsx, GroundTruthFormat, ImportOutcome,
    ParsedGroundTruth, SkippedRow, GROUND_TRUTH_SHEET, XLSX_CONTENT_TYPE,
};
pub use personas::{add_kpi, list_kpis, remove_kpi};
