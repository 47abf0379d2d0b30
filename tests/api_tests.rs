mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use hoop_api::{create_app, create_routes, AppState};
use hoop_services::PredictorService;

use common::*;

async fn create_test_app(dir: &std::path::Path) -> Router {
    let inputs = trained_workspace(dir);
    let predictor = PredictorService::load(inputs.predictor_paths()).await;
    create_routes().with_state(AppState::new(Arc::new(predictor)))
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn post_form(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["models_loaded"], true);
    assert!(health["timestamp"].is_string());
    assert!(health["version"].is_string());
}

#[tokio::test]
async fn test_form_lists_players_and_opponents() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Stephen Curry (201939)"));
    assert!(html.contains("LeBron James (2544)"));
    assert!(html.contains("<option value=\"MIA\""));
    assert!(html.contains("name=\"location\" value=\"away\""));
}

#[tokio::test]
async fn test_predict_known_player() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let request = json!({ "player_id": 2544, "opponent": "BOS", "home": true });
    let response = app.oneshot(post_json("/api/v1/predict", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["player_name"], "LeBron James");
    assert_eq!(data["opponent"], "BOS");
    for field in ["points", "assists", "rebounds", "threes_made"] {
        assert!(data[field].as_f64().unwrap().is_finite(), "{field}");
    }
    let probability = data["double_double_prob"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    assert!(data["features_used"].as_array().is_some_and(|f| !f.is_empty()));
}

#[tokio::test]
async fn test_predict_unknown_player_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let request = json!({ "player_id": 999, "opponent": "BOS", "home": false });
    let response = app.oneshot(post_json("/api/v1/predict", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"player_id\":"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_form_submission_renders_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app
        .oneshot(post_form("player_id=201939&opponent=LAL&location=away"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Stephen Curry @ LAL"));
    assert!(html.contains("Double-double probability"));
    assert!(html.contains("Feature values used"));
    assert!(html.contains("value=\"201939\" selected"));
}

#[tokio::test]
async fn test_form_submission_unknown_player() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app
        .oneshot(post_form("player_id=999&opponent=LAL&location=home"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Player not found"));
}

#[tokio::test]
async fn test_form_submission_invalid_player_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app
        .oneshot(post_form("player_id=abc&opponent=LAL&location=home"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Invalid player id"));
}

#[tokio::test]
async fn test_players_and_teams_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app.clone().oneshot(get("/api/v1/players?page=1&limit=2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let players = body_json(response).await;
    assert_eq!(players["data"].as_array().unwrap().len(), 2);
    assert_eq!(players["data"][0]["full_name"], "Jayson Tatum");
    assert_eq!(players["pagination"]["total"], 3);
    assert_eq!(players["pagination"]["pages"], 2);

    let response = app.oneshot(get("/api/v1/teams")).await.unwrap();
    let teams = body_json(response).await;
    assert_eq!(teams["data"], json!(["BOS", "DEN", "LAL", "MIA", "NYK"]));
}

#[tokio::test]
async fn test_players_page_far_past_the_end_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = trained_workspace(dir.path());
    let predictor = PredictorService::load(inputs.predictor_paths()).await;
    let app = create_app(AppState::new(Arc::new(predictor)));

    let response = app
        .oneshot(get("/api/v1/players?page=4294967295&limit=1000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let players = body_json(response).await;
    assert_eq!(players["data"], json!([]));
    assert_eq!(players["pagination"]["page"], 4_294_967_295_u64);
    assert_eq!(players["pagination"]["total"], 3);
}

#[tokio::test]
async fn test_reload_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path()).await;

    let response = app.oneshot(post_json("/api/v1/reload", &json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["players"], 3);
    assert_eq!(body["data"]["teams"], 5);
}

#[tokio::test]
async fn test_missing_assets_render_message() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = RawInputs::in_dir(dir.path());
    let predictor = PredictorService::load(inputs.predictor_paths()).await;
    let app = create_routes().with_state(AppState::new(Arc::new(predictor)));

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response).await.contains("not loaded"));

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(body_json(response).await["models_loaded"], false);

    let response = app.clone().oneshot(post_json("/api/v1/reload", &json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // assets appear once the pipeline has run
    trained_workspace(dir.path());
    let response = app.clone().oneshot(post_json("/api/v1/reload", &json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
