use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::picks::ReconcileEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconcileEngine>,
}

/// Build the Axum router for the JSON dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/board", get(board_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/ledger", get(ledger_handler))
        .route("/api/refresh", post(refresh_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/board: board from the last finished cycle
async fn board_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.engine.latest_board().await.map(Json).ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "No cycle has completed yet".to_string(),
    ))
}

/// GET /api/stats
async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .ledger_stats()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/ledger: every locked pick, newest first
async fn ledger_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .ledger_records()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// POST /api/refresh: run a cycle now
async fn refresh_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.run_cycle().await)
}
