use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Open realtime connections, authenticated or not.
    pub connections: usize,
    /// Users with a bound realtime connection.
    pub authenticated: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.hub.len().await,
        authenticated: state.registry.len().await,
    })
}
