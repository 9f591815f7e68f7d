use axum::{
    body::Body,
    debug_handler,
    extract::State,
    http::{Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::shared_wheel_game::{Slice, SpinRecord};
use shared::validation::validate_slices;
use tracing::info;

use crate::error::Error;
use crate::services::history_service::HistoryStats;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health_check", get(health_check))
        .route("/slices", get(get_slices).put(update_slices))
        .route("/slices/reset", post(reset_slices))
        .route("/history", get(get_history).delete(clear_history))
        .route("/stats", get(get_stats))
}

pub async fn health_check() -> impl IntoResponse {
    Response::builder()
        .status(StatusCode::OK)
        .body(Body::from("OK"))
        .unwrap_or_default()
}

#[debug_handler]
async fn get_slices(State(state): State<AppState>) -> Result<Json<Vec<Slice>>, Error> {
    Ok(Json(state.slices.get_slices()?))
}

#[debug_handler]
async fn update_slices(
    State(state): State<AppState>,
    Json(slices): Json<Vec<Slice>>,
) -> Result<Json<Vec<Slice>>, Error> {
    validate_slices(&slices)?;
    state.slices.set_slices(&slices)?;
    Ok(Json(slices))
}

#[debug_handler]
async fn reset_slices(State(state): State<AppState>) -> Result<Json<Vec<Slice>>, Error> {
    info!("Resetting wheel slices to defaults");
    Ok(Json(state.slices.reset()?))
}

#[debug_handler]
async fn get_history(State(state): State<AppState>) -> Result<Json<Vec<SpinRecord>>, Error> {
    Ok(Json(state.history.list()?))
}

#[debug_handler]
async fn clear_history(State(state): State<AppState>) -> Result<StatusCode, Error> {
    state.history.clear()?;
    info!("Spin history cleared");
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn get_stats(State(state): State<AppState>) -> Result<Json<HistoryStats>, Error> {
    Ok(Json(state.history.stats()?))
}
