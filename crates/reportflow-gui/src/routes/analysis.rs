use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use reportflow_core::EMPTY_TOPIC_MESSAGE;

use crate::error::AppError;
use crate::state::{AnalysisMetrics, AnalysisState, AnalysisStatus, AppState, SseStream};

#[derive(Debug, Deserialize)]
pub struct StartAnalysisRequest {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct StartAnalysisResponse {
    pub analysis_id: String,
    pub state: AnalysisState,
    pub capacity: AnalysisMetrics,
}

pub fn analysis_router() -> Router<AppState> {
    Router::new()
        .route("/analyses", post(start_analysis))
        .route("/analyses/:id", get(get_analysis))
        .route("/analyses/:id/stream", get(stream_analysis))
}

#[instrument(skip_all, fields(topic = %payload.topic))]
async fn start_analysis(
    State(state): State<AppState>,
    Json(payload): Json<StartAnalysisRequest>,
) -> Result<(StatusCode, Json<StartAnalysisResponse>), AppError> {
    if payload.topic.trim().is_empty() {
        return Err(AppError::bad_request(EMPTY_TOPIC_MESSAGE));
    }

    let service = state.analysis_service();
    let analysis_id = service.start_analysis(payload.topic);

    let response = StartAnalysisResponse {
        analysis_id,
        state: AnalysisState::Running,
        capacity: service.metrics(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<Json<AnalysisStatus>, AppError> {
    match state.analysis_service().status(&analysis_id) {
        Some(status) => Ok(Json(status)),
        None => Err(AppError::not_found("analysis")),
    }
}

async fn stream_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<Sse<SseStream>, AppError> {
    match state.analysis_service().event_stream(&analysis_id) {
        Some(stream) => Ok(Sse::new(stream).keep_alive(KeepAlive::new())),
        None => Err(AppError::not_found("analysis")),
    }
}
