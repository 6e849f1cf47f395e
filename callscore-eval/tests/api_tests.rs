//! Integration tests for callscore-eval API endpoints

use std::fs;
use std::path::Path;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use callscore_common::StorageLayout;
use callscore_eval::loader::FsStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

/// Test helper: app over a scratch store with one persona and three scored calls
fn create_test_app() -> (axum::Router, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    seed_store(temp_dir.path());

    let store = FsStore::new(temp_dir.path(), StorageLayout::default());
    let app = callscore_eval::build_router(callscore_eval::AppState::new(store));
    (app, temp_dir)
}

fn seed_store(root: &Path) {
    let write = |relative: &str, content: &str| {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    };

    write("prompts/sales.txt", "Score the call.");
    write("prompts/sales__config.json", r#"["greeting"]"#);
    write("llmanalysis/sales/c1.json", r#"{"greeting": {"score": true}}"#);
    write("llmanalysis/sales/c2.json", r#"{"greeting": {"score": false}}"#);
    write("llmanalysis/sales/c3.json", r#"{"greeting": {"score": false}}"#);
    write("evals/sales/c1.json", r#"{"Call ID": "c1", "greeting": "Yes"}"#);
    write("evals/sales/c2.json", r#"{"Call ID": "c2", "greeting": "No"}"#);
    write("evals/sales/c3.json", r#"{"Call ID": "c3", "greeting": "Yes"}"#);
}

fn test_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn extract_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(test_request("GET", "/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "callscore-eval");
    assert!(json["uptime_seconds"].is_u64());
}

// ============================================================================
// Personas and KPIs
// ============================================================================

#[tokio::test]
async fn test_list_personas_excludes_config_files() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(test_request("GET", "/api/personas", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response).await, json!({"personas": ["sales"]}));
}

#[tokio::test]
async fn test_add_and_remove_kpi() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(test_request(
            "POST",
            "/api/personas/sales/kpis",
            Some(json!({"name": " closing "})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        extract_json(response).await["kpis"],
        json!(["greeting", "closing"])
    );

    let response = app
        .clone()
        .oneshot(test_request(
            "POST",
            "/api/personas/sales/kpis",
            Some(json!({"name": "closing"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_json(response).await["error"]["code"], "BAD_REQUEST");

    let response = app
        .clone()
        .oneshot(test_request("DELETE", "/api/personas/sales/kpis/greeting", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response).await["kpis"], json!(["closing"]));

    let response = app
        .oneshot(test_request("GET", "/api/personas/sales/kpis", None))
        .await
        .unwrap();
    assert_eq!(extract_json(response).await["kpis"], json!(["closing"]));
}

#[tokio::test]
async fn test_unknown_persona_is_not_found() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(test_request("GET", "/api/personas/support/kpis", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_persona_id_with_dot_is_bad_request() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(test_request("GET", "/api/personas/sales.v2/kpis", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Ground truth upload
// ============================================================================

#[tokio::test]
async fn test_ground_truth_upload() {
    let (app, dir) = create_test_app();

    let csv = "Call ID,greeting\nc4,No\nnot found,Yes\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/personas/sales/ground-truth")
        .header("content-type", "text/csv")
        .body(Body::from(csv))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["imported"], json!(["c4"]));
    assert_eq!(json["skipped"][0]["row"], 2);

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("evals/sales/c4.json")).unwrap())
            .unwrap();
    assert_eq!(stored, json!({"Call ID": "c4", "greeting": "No"}));
}

#[tokio::test]
async fn test_ground_truth_xlsx_upload() {
    let (app, dir) = create_test_app();

    let mut book = rust_xlsxwriter::Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Parameters").unwrap();
    sheet.write_string(0, 0, "Call ID").unwrap();
    sheet.write_string(0, 1, "greeting").unwrap();
    sheet.write_string(1, 0, "c5").unwrap();
    sheet.write_number(1, 1, 1.0).unwrap();
    let bytes = book.save_to_buffer().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/personas/sales/ground-truth")
        .header(
            "content-type",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .body(Body::from(bytes))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response).await["imported"], json!(["c5"]));

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("evals/sales/c5.json")).unwrap())
            .unwrap();
    assert_eq!(stored, json!({"Call ID": "c5", "greeting": 1}));
}

#[tokio::test]
async fn test_ground_truth_upload_empty_body() {
    let (app, _dir) = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/personas/sales/ground-truth")
        .body(Body::from("  \n"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ground_truth_upload_missing_column() {
    let (app, _dir) = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/personas/sales/ground-truth")
        .body(Body::from("Call ID,closing\nc1,Yes\n"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = extract_json(response).await["error"]["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("greeting"), "{}", message);
}

// ============================================================================
// Evaluation
// ============================================================================

#[tokio::test]
async fn test_evaluation_report() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(test_request("GET", "/api/personas/sales/evaluation", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["persona"], "sales");
    assert_eq!(json["records"], 3);

    let outcome = &json["report"]["results"][0];
    assert_eq!(outcome["kpi"], "greeting");
    assert_eq!(outcome["outcome"]["status"], "scored");
    assert_eq!(outcome["outcome"]["averaging"], "binary");
    let accuracy = outcome["outcome"]["accuracy"].as_f64().unwrap();
    assert!((accuracy - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_evaluation_kpi_override() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(test_request(
            "GET",
            "/api/personas/sales/evaluation?kpis=greeting,closing",
            None,
        ))
        .await
        .unwrap();
    let json = extract_json(response).await;

    let results = json["report"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1]["outcome"]["status"], "missing_column");
    assert_eq!(results[1]["outcome"]["column"], "closing.score");
}

#[tokio::test]
async fn test_evaluation_skips_malformed_record() {
    let (app, dir) = create_test_app();
    fs::write(dir.path().join("llmanalysis/sales/bad.json"), "{not json").unwrap();

    let response = app
        .oneshot(test_request("GET", "/api/personas/sales/evaluation", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["records"], 3);
    assert_eq!(json["skipped"][0]["record"], "bad.json");
}
