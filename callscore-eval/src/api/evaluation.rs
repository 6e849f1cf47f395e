//! Evaluation endpoint
//!
//! `GET /api/personas/:persona/evaluation[?kpis=a,b]` recomputes the report
//! from the stored records on every request.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::run_blocking;
use crate::services::{evaluate_persona, PersonaEvaluation};
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct EvaluationQuery {
    /// Comma-separated KPI names overriding the persona config
    pub kpis: Option<String>,
}

impl EvaluationQuery {
    fn kpi_override(&self) -> Option<Vec<String>> {
        let raw = self.kpis.as_deref()?;
        let kpis: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|kpi| !kpi.is_empty())
            .map(str::to_string)
            .collect();
        (!kpis.is_empty()).then_some(kpis)
    }
}

/// GET /api/personas/:persona/evaluation
pub async fn get_evaluation(
    State(state): State<AppState>,
    Path(persona): Path<String>,
    Query(query): Query<EvaluationQuery>,
) -> ApiResult<Json<PersonaEvaluation>> {
    let store = state.store.clone();
    let kpis = query.kpi_override();
    let evaluation = run_blocking(move || {
        if !store.persona_exists(&persona)? {
            return Err(callscore_common::Error::NotFound(format!(
                "persona '{}'",
                persona
            )));
        }
        evaluate_persona(&store, &persona, kpis)
    })
    .await?;
    Ok(Json(evaluation))
}

/// Build evaluation routes
pub fn evaluation_routes() -> Router<AppState> {
    Router::new().route("/api/personas/:persona/evaluation", get(get_evaluation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kpi_override_parsing() {
        let query = EvaluationQuery {
            kpis: Some(" greeting, ,closing ".to_string()),
        };
        assert_eq!(
            query.kpi_override(),
            Some(vec!["greeting".to_string(), "closing".to_string()])
        );

        assert_eq!(EvaluationQuery::default().kpi_override(), None);
        let blank = EvaluationQuery {
            kpis: Some(" , ".to_string()),
        };
        assert_eq!(blank.kpi_override(), None);
    }
}
