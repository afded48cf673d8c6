//! HTTP API endpoints for the entry surface and read-only lobby views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::LobbyError;
use crate::state::{normalize_code, AppState};
use crate::types::{ItemResult, Lobby};

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub username: String,
}

/// Create a lobby owned by the caller.
///
/// POST /api/lobbies
pub async fn create_lobby(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> Response {
    match state.create_lobby(&req.username).await {
        Ok(joined) => (StatusCode::CREATED, Json(joined)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Join a waiting lobby.
///
/// POST /api/lobbies/{code}/join
pub async fn join_lobby(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<NameRequest>,
) -> Response {
    match state.join_lobby(&req.username, &code).await {
        Ok(joined) => Json(joined).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Read the lobby document once.
///
/// GET /api/lobbies/{code}
pub async fn get_lobby(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Lobby>, LobbyError> {
    let code = normalize_code(&code)?;
    Ok(Json(state.get_lobby(&code).await?))
}

/// Per-chocolate averages, best first.
///
/// GET /api/lobbies/{code}/results
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<ItemResult>>, LobbyError> {
    let code = normalize_code(&code)?;
    Ok(Json(state.get_results(&code).await?))
}

/// All HTTP and WebSocket routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/lobbies", post(create_lobby))
        .route("/api/lobbies/{code}", get(get_lobby))
        .route("/api/lobbies/{code}/join", post(join_lobby))
        .route("/api/lobbies/{code}/results", get(get_results))
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(state)
}
