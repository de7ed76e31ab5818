use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::{Router, routing::get};
use wastesense::StatusSnapshot;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[tracing::instrument(name = "GET /health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.context.status())
}
