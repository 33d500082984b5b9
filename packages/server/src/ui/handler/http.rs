//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use dojo_shared::time::millis_to_rfc3339;

use crate::{
    infrastructure::dto::http::{ConnectionDto, GameStateDto},
    ui::{error::ApiError, state::AppState},
    usecase::GameOverview,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Debug endpoint to get the current game state
pub async fn debug_game_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GameStateDto>, ApiError> {
    let overview = state.get_game_state_usecase.execute().await?;
    Ok(Json(to_dto(overview)))
}

// Domain Model から DTO への変換
fn to_dto(overview: GameOverview) -> GameStateDto {
    let GameOverview { state, connections } = overview;

    GameStateDto {
        current_challenge_id: state.current_challenge_id.map(|id| id.value()),
        current_user_ids: state.current_user_ids.iter().map(|id| id.value()).collect(),
        connections: connections
            .into_iter()
            .map(|connection| ConnectionDto {
                user_id: connection.user_id.value(),
                connection_id: connection.connection_id.to_string(),
                connected_at: millis_to_rfc3339(connection.connected_at),
            })
            .collect(),
        total_time: state.total_time,
        remaining_time: state.remaining_time,
        is_break: state.is_break,
    }
}
