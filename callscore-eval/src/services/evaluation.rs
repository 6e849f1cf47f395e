//! Persona evaluation
//!
//! Loads every analysis record of a persona with its ground truth, merges
//! each pair, aggregates the merged records into columns and scores the
//! requested KPIs. A record that cannot be read or parsed is logged and
//! skipped; it never aborts the run.

use callscore_common::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::loader::{RecordLoader, RecordRef};
use crate::scoring::{aggregate, evaluate, merge_records, EvaluationReport};

/// A record left out of the evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub record: RecordRef,
    pub reason: String,
}

/// Evaluation of one persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaEvaluation {
    pub persona: String,
    /// KPIs evaluated, in report order
    pub kpis: Vec<String>,
    /// Number of merged records that went into the columns
    pub records: usize,
    pub skipped: Vec<SkippedRecord>,
    pub report: EvaluationReport,
}

/// Evaluate a persona
///
/// `kpis` overrides the persona's configured KPI list when given. Failing to
/// list the records (or the KPIs) is an error; a persona with no records
/// yields an empty evaluation.
pub fn evaluate_persona<L>(
    loader: &L,
    persona: &str,
    kpis: Option<Vec<String>>,
) -> Result<PersonaEvaluation>
where
    L: RecordLoader + ?Sized,
{
    let kpis = match kpis {
        Some(kpis) => kpis,
        None => loader.list_kpis(persona)?,
    };
    let refs = loader.list_analyses(persona)?;

    let mut merged = Vec::with_capacity(refs.len());
    let mut skipped = Vec::new();

    for record in refs {
        let loaded = loader.read_analysis(persona, &record).and_then(|analysis| {
            let truth = loader.read_ground_truth(persona, &record)?;
            Ok(merge_records(&analysis, truth.as_ref()))
        });

        match loaded {
            Ok(value) => merged.push(value),
            Err(e) => {
                warn!(persona = %persona, record = %record, error = %e, "Skipping malformed record");
                skipped.push(SkippedRecord {
                    record,
                    reason: e.to_string(),
                });
            }
        }
    }

    let store = aggregate(&merged);
    let report = evaluate(&store, &kpis);

    info!(
        persona = %persona,
        records = merged.len(),
        skipped = skipped.len(),
        kpis = kpis.len(),
        scored = report.scored_count(),
        "Persona evaluated"
    );

    Ok(PersonaEvaluation {
        persona: persona.to_string(),
        kpis,
        records: merged.len(),
        skipped,
        report,
    })
}
