use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Form, Router,
};
use chrono::{DateTime, Utc};
use hoop_models::{HoopError, PlayerInfo, PredictionRequest, StatPrediction};
use hoop_services::PredictorService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::form::{render_page, FormView, Outcome};

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<PredictorService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(predictor: Arc<PredictorService>) -> Self {
        Self {
            predictor,
            started_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub pagination: Option<PaginationInfo>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message,
            pagination: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub pages: u32,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime: String,
    pub models_loaded: bool,
}

/// Form fields as posted by the HTML page.
#[derive(Debug, Deserialize)]
pub struct PredictionForm {
    pub player_id: String,
    pub opponent: String,
    #[serde(default)]
    pub location: String,
}

impl PredictionForm {
    fn into_request(self) -> Result<PredictionRequest, String> {
        let player_id = self
            .player_id
            .trim()
            .parse()
            .map_err(|_| format!("Invalid player id: {}", self.player_id))?;
        let opponent = self.opponent.trim().to_uppercase();
        if opponent.is_empty() {
            return Err("Select an opponent".to_string());
        }
        Ok(PredictionRequest {
            player_id,
            opponent,
            home: !self.location.eq_ignore_ascii_case("away"),
        })
    }
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health_check))
        // Interactive form
        .route("/", get(prediction_form))
        .route("/predict", post(submit_prediction_form))
        // JSON API
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/players", get(list_players))
        .route("/api/v1/teams", get(list_teams))
        .route("/api/v1/reload", post(reload_assets))
}

/// Routes with the serving middleware: request tracing, permissive CORS and
/// a panic guard that turns a handler panic into a 500.
pub fn create_app(state: AppState) -> Router {
    create_routes()
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn error_status(err: &HoopError) -> StatusCode {
    match err {
        HoopError::PlayerNotFound { .. } => StatusCode::NOT_FOUND,
        HoopError::MissingFile { .. } | HoopError::Artifact(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_failure(err: &HoopError) {
    if matches!(err, HoopError::PlayerNotFound { .. }) {
        warn!("🔍 {}", err);
    } else {
        error!("❌ Prediction failed: {}", err);
    }
}

// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();
    let uptime = (now - state.started_at).num_seconds().max(0);
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: now.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: format!("{}h {}m {}s", uptime / 3600, (uptime % 3600) / 60, uptime % 60),
        models_loaded: state.predictor.is_ready().await,
    })
}

async fn form_page(
    state: &AppState,
    selected: Option<&PredictionRequest>,
    outcome: Outcome<'_>,
    status: StatusCode,
) -> (StatusCode, Html<String>) {
    let assets = match state.predictor.assets().await {
        Ok(assets) => assets,
        Err(e) => {
            let message = e.to_string();
            let view = FormView {
                players: &[],
                teams: &[],
                selected,
            };
            return (error_status(&e), Html(render_page(&view, &Outcome::Error(&message))));
        }
    };
    let view = FormView {
        players: assets.players(),
        teams: assets.opponents(),
        selected,
    };
    (status, Html(render_page(&view, &outcome)))
}

// Empty form
async fn prediction_form(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    form_page(&state, None, Outcome::Empty, StatusCode::OK).await
}

// Form submission: re-renders the form with results or an error message
async fn submit_prediction_form(
    State(state): State<AppState>,
    form: Result<Form<PredictionForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let request = match form.map_err(|e| e.body_text()).and_then(|Form(f)| f.into_request()) {
        Ok(request) => request,
        Err(message) => {
            warn!("📝 Rejected form submission: {}", message);
            return form_page(&state, None, Outcome::Error(&message), StatusCode::BAD_REQUEST).await;
        }
    };

    match state.predictor.predict(&request).await {
        Ok(prediction) => {
            form_page(&state, Some(&request), Outcome::Prediction(&prediction), StatusCode::OK).await
        }
        Err(e) => {
            log_failure(&e);
            let message = e.to_string();
            form_page(&state, Some(&request), Outcome::Error(&message), error_status(&e)).await
        }
    }
}

// JSON prediction
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<StatPrediction>>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.body_text()))),
    };

    match state.predictor.predict(&request).await {
        Ok(prediction) => (StatusCode::OK, Json(ApiResponse::ok(prediction, None))),
        Err(e) => {
            log_failure(&e);
            (error_status(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

// Players with processed rows, sorted by name
async fn list_players(
    Query(params): Query<PaginationParams>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<PlayerInfo>>>) {
    let players = match state.predictor.players().await {
        Ok(players) => players,
        Err(e) => return (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    };

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let total = players.len() as u32;
    let start = (page as usize - 1).saturating_mul(limit as usize);
    let end = start.saturating_add(limit as usize).min(players.len());

    let page_players = if start < players.len() {
        players[start..end].to_vec()
    } else {
        vec![]
    };

    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(page_players),
            message: None,
            pagination: Some(PaginationInfo {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            }),
        }),
    )
}

// Opponent abbreviations the models were trained with
async fn list_teams(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Vec<String>>>) {
    match state.predictor.teams().await {
        Ok(teams) => (StatusCode::OK, Json(ApiResponse::ok(teams, None))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

// Re-read artifacts and tables from disk
async fn reload_assets(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    if let Err(e) = state.predictor.reload().await {
        error!("❌ Reload failed: {:#}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Reload failed: {e:#}"))),
        );
    }

    let players = state.predictor.players().await.map(|p| p.len()).unwrap_or(0);
    let teams = state.predictor.teams().await.map(|t| t.len()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(ApiResponse::ok(
            serde_json::json!({ "players": players, "teams": teams }),
            Some("Prediction assets reloaded".to_string()),
        )),
    )
}
