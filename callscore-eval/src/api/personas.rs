//! Persona endpoints: persona list, KPI edits and ground-truth upload
//!
//! - `GET /api/personas`
//! - `GET /api/personas/:persona/kpis`
//! - `POST /api/personas/:persona/kpis` with `{"name": "..."}`
//! - `DELETE /api/personas/:persona/kpis/:name`
//! - `POST /api/personas/:persona/ground-truth` with a CSV or XLSX body

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::run_blocking;
use crate::services::{self, GroundTruthFormat, ImportOutcome};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct PersonasResponse {
    pub personas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct KpiListResponse {
    pub persona: String,
    pub kpis: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddKpiRequest {
    pub name: String,
}

/// GET /api/personas
pub async fn list_personas(State(state): State<AppState>) -> ApiResult<Json<PersonasResponse>> {
    let store = state.store.clone();
    let personas = run_blocking(move || store.list_personas()).await?;
    Ok(Json(PersonasResponse { personas }))
}

/// GET /api/personas/:persona/kpis
pub async fn list_kpis(
    State(state): State<AppState>,
    Path(persona): Path<String>,
) -> ApiResult<Json<KpiListResponse>> {
    let store = state.store.clone();
    let id = persona.clone();
    let kpis = run_blocking(move || services::list_kpis(&store, &id)).await?;
    Ok(Json(KpiListResponse { persona, kpis }))
}

/// POST /api/personas/:persona/kpis
///
/// Returns 201 with the updated list, 400 for an empty or duplicate name.
pub async fn add_kpi(
    State(state): State<AppState>,
    Path(persona): Path<String>,
    Json(payload): Json<AddKpiRequest>,
) -> ApiResult<(StatusCode, Json<KpiListResponse>)> {
    let store = state.store.clone();
    let id = persona.clone();
    let kpis = run_blocking(move || services::add_kpi(&store, &id, &payload.name)).await?;
    Ok((StatusCode::CREATED, Json(KpiListResponse { persona, kpis })))
}

/// DELETE /api/personas/:persona/kpis/:name
pub async fn remove_kpi(
    State(state): State<AppState>,
    Path((persona, name)): Path<(String, String)>,
) -> ApiResult<Json<KpiListResponse>> {
    let store = state.store.clone();
    let id = persona.clone();
    let kpis = run_blocking(move || services::remove_kpi(&store, &id, &name)).await?;
    Ok(Json(KpiListResponse { persona, kpis }))
}

/// POST /api/personas/:persona/ground-truth
///
/// Body is CSV text or an XLSX workbook (content type or zip signature).
/// Missing columns or a persona without KPIs are 400.
pub async fn upload_ground_truth(
    State(state): State<AppState>,
    Path(persona): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ImportOutcome>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("empty upload body".to_string()));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let format = GroundTruthFormat::detect(content_type, &body);

    let store = state.store.clone();
    let outcome = run_blocking(move || {
        if !store.persona_exists(&persona)? {
            return Err(callscore_common::Error::NotFound(format!(
                "persona '{}'",
                persona
            )));
        }
        services::import_ground_truth(&store, &persona, format, &body)
    })
    .await?;
    Ok(Json(outcome))
}

/// Build persona routes
pub fn persona_routes() -> Router<AppState> {
    Router::new()
        .route("/api/personas", get(list_personas))
        .route("/api/personas/:persona/kpis", get(list_kpis).post(add_kpi))
        .route("/api/personas/:persona/kpis/:name", delete(remove_kpi))
        .route("/api/personas/:persona/ground-truth", post(upload_ground_truth))
}
